use std::env;

use ironlink::{IrcSession, SessionConfig, SessionEvent, TcpConnector};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = SessionConfig::new(
        env::var("IRC_SERVER").unwrap_or_else(|_| "irc.libera.chat".to_string()),
        vec![
            env::var("IRC_NICK").unwrap_or_else(|_| "ironlink_demo".to_string()),
            "ironlink_demo_".to_string(),
        ],
    );
    config.port = env::var("IRC_PORT")
        .unwrap_or_else(|_| "6667".to_string())
        .parse()
        .unwrap_or(6667);
    config.username = "ironlink".to_string();
    config.realname = "ironlink echo demo".to_string();

    let channel = env::var("IRC_CHANNEL").unwrap_or_else(|_| "#ironlink-test".to_string());

    println!("Connecting to {}:{}...", config.server, config.port);
    let session = IrcSession::new(config);
    let (outcome, mut events) = session.connect(TcpConnector)?;

    let welcome = outcome.await?;
    println!(
        "Registered as {} (capabilities: {:?})",
        welcome.nickname, welcome.capabilities
    );
    session.write(vec!["JOIN", channel.as_str()])?;

    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Data(line) => {
                println!("<- {}", line);
                // Echo channel messages back, very crudely.
                if let Some(text) = line.split(&format!("PRIVMSG {} :", channel)).nth(1) {
                    if !text.starts_with("echo:") {
                        session.write(format!("PRIVMSG {} :echo: {}", channel, text))?;
                    }
                }
            }
            SessionEvent::TimedOut => println!("(keepalive timed out)"),
            SessionEvent::Ended => println!("(server closed the stream)"),
            SessionEvent::Closed => {
                println!("(session closed)");
                break;
            }
            other => println!("-- {:?}", other),
        }
    }
    Ok(())
}
