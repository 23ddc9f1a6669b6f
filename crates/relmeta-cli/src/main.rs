use clap::Parser;
use cli::{Args, Commands};
use logging::setup_logging;
use metadata::{generate_records, write_records};
use relmeta_config::config::{Config, Timeout};
use relmeta_core::{keys::RemoteKeys, RelmetaError, RelmetaResult};
use relmeta_dl::{
    http_client::{configure_http_client, ClientConfig},
    Github,
};
use tracing::debug;
use ureq::Proxy;
use utils::{parse_headers, COLOR};
use versions::list_versions;

mod cli;
mod logging;
mod metadata;
mod utils;
mod versions;

/// Loads the config file and folds command line overrides into it.
fn load_config(args: &Args) -> RelmetaResult<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::new()?,
    };

    if let Some(timeout) = &args.timeout {
        config.network.timeout = Some(timeout.clone());
    }
    if let Some(user_agent) = &args.user_agent {
        config.network.user_agent = Some(user_agent.clone());
    }
    if let Some(proxy) = &args.proxy {
        config.network.proxy = Some(proxy.clone());
    }
    config.resolve()?;

    Ok(config)
}

fn apply_timeout(client: &mut ClientConfig, timeout: Timeout) {
    match timeout {
        Timeout::Default => {}
        Timeout::Disabled => client.timeout = None,
        Timeout::After(duration) => client.timeout = Some(duration),
    }
}

fn configure_client(config: &Config, headers: Option<&[String]>) -> RelmetaResult<()> {
    let timeout = config.timeout()?;
    let proxy = config
        .network
        .proxy
        .as_deref()
        .map(Proxy::new)
        .transpose()
        .map_err(|err| RelmetaError::Custom(format!("Invalid proxy: {err}")))?;
    let headers = headers.map(parse_headers).transpose()?;
    let user_agent = config.network.user_agent.clone();

    debug!("http timeout: {timeout:?}");
    configure_http_client(|client| {
        apply_timeout(client, timeout);

        if let Some(proxy) = proxy {
            client.proxy = Some(proxy);
        }

        if let Some(user_agent) = user_agent {
            client.user_agent = Some(user_agent);
        }

        if let Some(headers) = headers {
            client.headers = Some(headers);
        }
    });

    Ok(())
}

fn handle_cli() -> RelmetaResult<()> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        let mut color = COLOR
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *color = false;
    }

    let config = load_config(&args)?;
    configure_client(&config, args.header.as_deref())?;

    let locator =
        Github::new(config.source.api_url.as_str()).token_env(config.source.token_env.iter());
    let keys = RemoteKeys::new(config.trust.key_urls.iter().cloned());

    match args.command {
        Commands::Config => print!("{}", config.to_toml()?),
        Commands::Versions {
            json_output,
            limit,
        } => list_versions(&locator, &keys, &config, json_output, limit)?,
        Commands::Metadata {
            versions,
            output,
            strict,
        } => {
            let records = generate_records(&locator, &keys, &config, &versions, strict)?;
            write_records(&records, output.as_deref())?;
        }
    }

    Ok(())
}

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli() {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
