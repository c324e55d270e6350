use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 8090,
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

#[derive(Deserialize, Debug)]
pub struct OptimizerConfig {
    pub url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Deserialize, Debug)]
pub struct Config {
    #[serde(default)]
    pub listener: Listener,
    pub optimizer: OptimizerConfig,
}
