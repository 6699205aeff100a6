//! Load subcommand: open a session, load a page and extract artifacts.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use viewpump_config::{Config, ConfigValidator};
use viewpump_core::{
    AllowMode, LoadOptions, PdfOptions, Session, SessionEvent, SessionOptions, XvfbProvider,
};
use viewpump_view_stdio::StdioViewFactory;

use crate::cli::LoadArgs;

/// Handle `viewpump load`.
pub(crate) async fn handle_load_command(args: LoadArgs, config: Config) -> anyhow::Result<()> {
    for warning in ConfigValidator::validate(&config).into_result()? {
        warn!("Config {}: {}", warning.path, warning.message);
    }

    let mut options = SessionOptions::from_config(&config)?;
    if let Some(display) = args.display {
        options.display = display;
    }

    let factory = StdioViewFactory::from_config(&config.host)?;
    let provider = Arc::new(XvfbProvider::new(&config.display.xvfb_path));
    let session = Session::create(&factory, provider, options).await?;
    info!(
        "Session {} ready on display :{}",
        session.event_name(),
        session.display()
    );

    let mut events = session.subscribe();
    let event_log = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Request(request)) => debug!("Request {}", request.uri),
                Ok(SessionEvent::Response(response)) => {
                    debug!("Response {} {}", response.status, response.uri)
                }
                Ok(event) => debug!("Session event {}", event.name()),
                Err(RecvError::Lagged(skipped)) => warn!("Event log skipped {} events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let result = extract(&session, &args).await;

    event_log.abort();
    session.close();
    result
}

async fn extract(session: &Session, args: &LoadArgs) -> anyhow::Result<()> {
    let mut load = LoadOptions::new();
    if let Some(allow) = &args.allow {
        load = load.with_allow(allow.parse::<AllowMode>()?);
    }
    for cookie in &args.cookies {
        load = load.with_cookie(cookie.clone());
    }
    if let Some(stylesheet) = &args.stylesheet {
        load = load.with_stylesheet(stylesheet.clone());
    }
    if let Some(user_agent) = &args.user_agent {
        load = load.with_user_agent(user_agent.clone());
    }

    session.load(&args.uri, load).await?;
    info!("Loaded {}", args.uri);

    for script in &args.scripts {
        let value = session.run(script).await?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    }

    if args.html {
        println!("{}", session.html().await?);
    }

    if let Some(path) = &args.png {
        session.save_png(path).await?;
        info!("Saved PNG to {}", path.display());
    }

    if let Some(path) = &args.pdf {
        let options = PdfOptions {
            landscape: args.landscape,
            ..Default::default()
        };
        session.pdf(path, &options).await?;
        info!("Saved PDF to {}", path.display());
    }

    Ok(())
}
