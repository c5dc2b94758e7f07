use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub razorpay_key_id: String,
    pub razorpay_key_secret: String,
    pub dev_mode: bool,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("COURSEPAY_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "coursepay.db".to_string()),
            razorpay_key_id: env::var("RAZORPAY_KEY_ID")
                .unwrap_or_else(|_| "rzp_test_placeholder".to_string()),
            razorpay_key_secret: env::var("RAZORPAY_KEY_SECRET")
                .unwrap_or_else(|_| "secret_placeholder".to_string()),
            dev_mode,
        }
    }

    /// True when no real Razorpay credentials were supplied via the environment.
    pub fn has_placeholder_keys(&self) -> bool {
        self.razorpay_key_id == "rzp_test_placeholder"
            || self.razorpay_key_secret == "secret_placeholder"
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
