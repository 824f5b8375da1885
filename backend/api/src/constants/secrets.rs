use std::fs;
use std::path::Path;

const DOCKER_SECRETS_PATH: &str = "/run/secrets/";

/// Read a Docker secret by name, trimming the trailing newline editors tend to leave.
pub fn read_secret(name: &str) -> Result<String, std::io::Error> {
    let secret_val = fs::read_to_string(Path::new(DOCKER_SECRETS_PATH).join(name.to_lowercase()))?;
    Ok(secret_val.trim_end().to_owned())
}
