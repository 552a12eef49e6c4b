use anyhow::Result;

pub fn hash(password: &str) -> Result<String> {
    if password.is_empty() {
        anyhow::bail!("password must not be empty");
    }
    Ok(tumiki_auth::password::hash_password(password)?)
}
