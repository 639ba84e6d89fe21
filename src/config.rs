use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub region: String,
    pub table_name: String,
    pub host: String,
    pub port: u16,
    /// Endpoint override, e.g. `http://localhost:8000` for DynamoDB Local.
    pub dynamodb_endpoint: Option<String>,
    /// Create the table at startup when it does not exist yet.
    pub ensure_table: bool,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Ok(Self {
            region: var("AWS_REGION").unwrap_or_else(|| "us-east-1".to_string()),
            table_name: var("DYNAMODB_PRODUCTS_TABLE")
                .unwrap_or_else(|| "aws-microservices-cicd-products".to_string()),
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: var("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            dynamodb_endpoint: var("DYNAMODB_ENDPOINT"),
            ensure_table: var("DYNAMODB_ENSURE_TABLE")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        })
    }
}
