pub mod server;

use secrecy::SecretString;
use std::path::PathBuf;

#[derive(Debug)]
pub enum Action {
    Server {
        port: u16,
        dsn: String,
        google_client_id: String,
        google_client_secret: SecretString,
        public_url: String,
        assets_dir: PathBuf,
    },
}
