//! Line commands typed on stdin.

use audiofetch_core::{DownloadForm, DownloadMode, Msg};

pub const HELP: &str = "\
commands:
  download <url> [--name N] [--plugin P] [--workers N] [--server]
  cancel <job>      clear <job>      get <job>
  login <password>  logout
  downloads         zip <name>       rm <name>
  show              help             quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Send(Msg),
    Show,
    Help,
    Quit,
}

pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let command = match verb {
        "" => return Ok(None),
        "download" | "dl" => Command::Send(Msg::DownloadSubmitted(parse_form(rest)?)),
        "cancel" => Command::Send(Msg::CancelClicked(required(rest, "job id")?)),
        "clear" => Command::Send(Msg::ClearClicked(required(rest, "job id")?)),
        "get" => Command::Send(Msg::RetrieveClicked(required(rest, "job id")?)),
        "login" => Command::Send(Msg::LoginSubmitted {
            password: required(rest, "password")?,
        }),
        "logout" => Command::Send(Msg::LogoutClicked),
        "downloads" => Command::Send(Msg::ServerDownloadsRefreshClicked),
        "zip" => Command::Send(Msg::ServerZipClicked {
            name: required(rest, "download name")?,
        }),
        "rm" => Command::Send(Msg::ServerDeleteClicked {
            name: required(rest, "download name")?,
        }),
        "show" | "list" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command {other:?}; try help")),
    };
    Ok(Some(command))
}

fn required(rest: &str, what: &str) -> Result<String, String> {
    if rest.is_empty() {
        Err(format!("missing {what}"))
    } else {
        Ok(rest.to_string())
    }
}

/// An empty url is passed through; the core reports it.
fn parse_form(rest: &str) -> Result<DownloadForm, String> {
    let mut form = DownloadForm::default();
    let mut words = rest.split_whitespace();
    while let Some(word) = words.next() {
        match word {
            "--name" => form.name = Some(value(&mut words, "--name")?),
            "--plugin" => form.plugin = Some(value(&mut words, "--plugin")?),
            "--workers" => {
                let raw = value(&mut words, "--workers")?;
                let workers = raw
                    .parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| format!("invalid worker count {raw:?}"))?;
                form.workers = Some(workers);
            }
            "--server" => form.mode = DownloadMode::Server,
            url if form.url.is_empty() => form.url = url.to_string(),
            extra => return Err(format!("unexpected argument {extra:?}")),
        }
    }
    Ok(form)
}

fn value<'a>(words: &mut impl Iterator<Item = &'a str>, flag: &str) -> Result<String, String> {
    words
        .next()
        .map(str::to_string)
        .ok_or_else(|| format!("{flag} needs a value"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn download_with_options() {
        let command = parse("download https://a.example/x --name Mix --workers 3 --server")
            .unwrap()
            .unwrap();
        assert_eq!(
            command,
            Command::Send(Msg::DownloadSubmitted(DownloadForm {
                url: "https://a.example/x".to_string(),
                name: Some("Mix".to_string()),
                plugin: None,
                workers: Some(3),
                mode: DownloadMode::Server,
            }))
        );
    }

    #[test]
    fn bare_download_submits_empty_url() {
        assert_eq!(
            parse("download").unwrap(),
            Some(Command::Send(Msg::DownloadSubmitted(DownloadForm::default())))
        );
    }

    #[test]
    fn names_keep_spaces() {
        assert_eq!(
            parse("zip  My Album ").unwrap(),
            Some(Command::Send(Msg::ServerZipClicked {
                name: "My Album".to_string()
            }))
        );
    }

    #[test]
    fn errors_are_reported() {
        assert!(parse("cancel").is_err());
        assert!(parse("download u --workers 0").is_err());
        assert!(parse("download u v").is_err());
        assert!(parse("frobnicate").is_err());
        assert_eq!(parse("   ").unwrap(), None);
    }
}
