use fantoccini::{Client, ClientBuilder};
use serde_json::{Map, Value, json};
use std::path::PathBuf;

/// Browser settings forwarded to the driver as capabilities.
#[derive(Debug, Clone, Default)]
pub struct DriverOptions {
    pub headless: bool,
    pub user_data_dir: Option<PathBuf>,
    pub user_agent: Option<String>,
}

impl DriverOptions {
    /// W3C capabilities with Chrome-specific arguments.
    pub fn capabilities(&self) -> Map<String, Value> {
        let mut args = vec![
            "--no-sandbox".to_string(),
            "--window-size=1280,900".to_string(),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }
        if let Some(dir) = &self.user_data_dir {
            args.push(format!("--user-data-dir={}", dir.display()));
        }
        if let Some(ua) = &self.user_agent {
            args.push(format!("--user-agent={}", ua));
        }

        let mut caps = Map::new();
        caps.insert("browserName".into(), json!("chrome"));
        caps.insert("goog:chromeOptions".into(), json!({ "args": args }));
        caps
    }
}

pub struct WebDriverClient {
    pub client: Client,
}

impl WebDriverClient {
    pub async fn connect(
        url: &str,
        capabilities: Map<String, Value>,
    ) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let client = ClientBuilder::native()
            .capabilities(capabilities)
            .connect(url)
            .await
            .map_err(|e| format!("Failed to connect to WebDriver at {}: {}", url, e))?;

        Ok(Self { client })
    }

    pub async fn close(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.client
            .close()
            .await
            .map_err(|e| format!("Failed to close session: {}", e))?;
        Ok(())
    }
}
