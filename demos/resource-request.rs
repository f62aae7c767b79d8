use std::io;

use acme_core::{AccountKey, Client, DirectoryUrl};
use tokio::fs;

const KEY_PATH: &str = "./acme-account.pem";

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    log::info!("loading account key from disk");
    let key = match fs::read_to_string(KEY_PATH).await {
        Ok(pem) => AccountKey::from_pem(&pem)?,

        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            log::info!("generating RSA account key");
            let key = AccountKey::generate_rsa(2048)?;

            log::info!("persisting account key to {KEY_PATH}");
            fs::write(KEY_PATH, key.to_pem()?.as_bytes()).await?;

            key
        }

        Err(err) => return Err(err.into()),
    };

    log::info!("account key thumbprint: {}", key.thumbprint()?);

    let client = Client::new(DirectoryUrl::LetsEncryptStaging, key)?;

    log::info!("fetching LetsEncrypt staging directory");
    let dir = client.directory().await?;

    let mut names = dir.resources().keys().collect::<Vec<_>>();
    names.sort();

    for name in names {
        log::info!("{name} -> {}", client.resolve(name).await?);
    }

    if let Some(tos) = dir.meta().and_then(|meta| meta.terms_of_service.as_deref()) {
        log::info!("terms of service: {tos}");
    }

    log::info!("looking up existing account");
    let res = client
        .post("newAccount", &serde_json::json!({ "onlyReturnExisting": true }))
        .await?;

    match res.problem().filter(|_| !res.status.is_success()) {
        Some(problem) => log::info!("server answered {}: {problem}", res.status),
        None => log::info!(
            "account found at {}",
            res.header("location").unwrap_or("<no location>")
        ),
    }

    Ok(())
}
