//! Interactive command loop.
//!
//! A thin read-eval wrapper around the resolver: parses one command per
//! line, runs lookups, prints result tables and cache dumps. Everything here
//! is presentation; resolution behavior lives in [`crate::resolver`].

use std::io::{IsTerminal, Write};
use std::net::IpAddr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::Result;
use crate::record::{RecordKey, RecordType, ResourceRecord};
use crate::resolver::Resolver;
use crate::transport::Transport;

const PROMPT: &str = "burrow> ";

const HELP: &str = "Invalid command. Valid commands are:\n\
                    \tlookup [fqdn] [type]\n\
                    \ttrace [on|off]\n\
                    \tserver [IP]\n\
                    \tdump\n\
                    \tquit";

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Lookup { host: String, rtype: RecordType },
    Trace { enabled: bool },
    SetServer { server: IpAddr },
    Dump,
    Quit,
}

impl Command {
    /// Parse one input line.
    ///
    /// `Ok(None)` means the line was blank or a comment; `Err` carries the
    /// message to show the user. Anything after `#` is ignored.
    pub fn parse(line: &str) -> std::result::Result<Option<Self>, String> {
        let line = line.split('#').next().unwrap_or_default().trim();
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();

        match command.to_ascii_lowercase().as_str() {
            "quit" | "exit" => Ok(Some(Self::Quit)),
            "dump" => Ok(Some(Self::Dump)),
            "server" => match args.as_slice() {
                [addr] => addr
                    .parse()
                    .map(|server| Some(Self::SetServer { server }))
                    .map_err(|err| format!("Invalid root server ({err}).")),
                _ => Err("Invalid call. Format:\n\tserver IP".to_string()),
            },
            "trace" => match args.as_slice() {
                [mode] if mode.eq_ignore_ascii_case("on") => {
                    Ok(Some(Self::Trace { enabled: true }))
                }
                [mode] if mode.eq_ignore_ascii_case("off") => {
                    Ok(Some(Self::Trace { enabled: false }))
                }
                _ => Err("Invalid call. Format:\n\ttrace on|off".to_string()),
            },
            "lookup" | "l" => match args.as_slice() {
                [host] => Ok(Some(Self::Lookup {
                    host: (*host).to_string(),
                    rtype: RecordType::A,
                })),
                [host, rtype] => RecordType::from_name(rtype)
                    .map(|rtype| {
                        Some(Self::Lookup {
                            host: (*host).to_string(),
                            rtype,
                        })
                    })
                    .ok_or_else(|| {
                        "Invalid query type. Must be one of:\n\tA, AAAA, NS, MX, CNAME".to_string()
                    }),
                _ => Err("Invalid call. Format:\n\tlookup hostName [type]".to_string()),
            },
            _ => Err(HELP.to_string()),
        }
    }
}

/// Render a result set in the classic four-column layout.
///
/// An empty set prints one placeholder line so a failed lookup is still
/// visible in the output.
pub fn render_results<'a, I>(key: &RecordKey, records: I) -> String
where
    I: IntoIterator<Item = &'a ResourceRecord>,
{
    let mut records = records.into_iter().peekable();
    if records.peek().is_none() {
        return format!(
            "{:<30} {:<5} {:<8} {}\n",
            key.host,
            key.rtype.to_string(),
            -1,
            "0.0.0.0"
        );
    }
    let mut out = String::new();
    for record in records {
        out.push_str(&format!(
            "{:<30} {:<5} {:<8} {}\n",
            key.host,
            key.rtype.to_string(),
            record.ttl,
            record.data
        ));
    }
    out
}

/// Callback flipping verbose tracing; the binary wires this to its
/// subscriber reload handle.
pub type TraceToggle = Box<dyn Fn(bool) + Send>;

/// The read-eval loop.
pub struct Shell<T: Transport> {
    resolver: Resolver<T>,
    trace_toggle: TraceToggle,
}

impl<T: Transport> Shell<T> {
    pub fn new(resolver: Resolver<T>, trace_toggle: TraceToggle) -> Self {
        Self {
            resolver,
            trace_toggle,
        }
    }

    /// Run until EOF or `quit`.
    pub async fn run<R: AsyncBufRead + Unpin>(mut self, input: R) -> Result<()> {
        let mut lines = input.lines();
        prompt();
        while let Some(line) = lines.next_line().await? {
            match Command::parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => self.execute(command).await,
                Ok(None) => {}
                Err(message) => eprintln!("{message}"),
            }
            prompt();
        }
        Ok(())
    }

    async fn execute(&mut self, command: Command) {
        match command {
            Command::Lookup { host, rtype } => {
                let key = RecordKey::new(host, rtype);
                let records = self.resolver.resolve(key.clone()).await;
                print!("{}", render_results(&key, &records));
            }
            Command::Trace { enabled } => {
                (self.trace_toggle)(enabled);
                println!(
                    "Verbose tracing is now: {}",
                    if enabled { "ON" } else { "OFF" }
                );
            }
            Command::SetServer { server } => {
                self.resolver.set_root(server);
                println!("Root DNS server is now: {server}");
            }
            Command::Dump => {
                for (key, records) in self.resolver.cache().entries() {
                    print!("{}", render_results(&key, &records));
                }
            }
            Command::Quit => {}
        }
    }
}

fn prompt() {
    // only decorate interactive sessions; piped input stays clean
    if std::io::stdout().is_terminal() {
        print!("{PROMPT}");
        let _ = std::io::stdout().flush();
    }
}
