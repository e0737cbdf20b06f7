use anyhow::Result;
use chrono::{DateTime, Local};
use shortlink_core::{RecordSnapshot, Registry};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

/// Maximum allowed target length (2 KB)
const MAX_TARGET_LENGTH: usize = 2048;

/// Truncates a code for safe logging (codes typed by users can be anything)
fn truncate_code_for_log(code: &str) -> String {
    const MAX_LOG_LEN: usize = 16;
    if code.chars().count() <= MAX_LOG_LEN {
        code.to_string()
    } else {
        format!("{}...", code.chars().take(MAX_LOG_LEN).collect::<String>())
    }
}

/// Validates a target URL entered by the user
fn validate_target(raw: &str) -> Result<&str, String> {
    let target = raw.trim();
    if target.is_empty() {
        return Err("URL cannot be empty".to_string());
    }
    if target.len() > MAX_TARGET_LENGTH {
        return Err(format!(
            "URL exceeds maximum length of {} bytes",
            MAX_TARGET_LENGTH
        ));
    }
    Ok(target)
}

/// Parses a click limit entered by the user
fn parse_click_limit(raw: &str) -> Result<u32, String> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err("click limit must be at least 1".to_string()),
        Ok(limit) => Ok(limit),
        Err(_) => Err(format!("'{}' is not a valid click limit", raw.trim())),
    }
}

fn format_time(time: std::time::SystemTime) -> String {
    DateTime::<Local>::from(time)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Create,
    Open,
    List,
    Stats,
    Exit,
}

impl Choice {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1" => Some(Choice::Create),
            "2" => Some(Choice::Open),
            "3" => Some(Choice::List),
            "4" => Some(Choice::Stats),
            "5" => Some(Choice::Exit),
            _ => None,
        }
    }
}

/// Interactive menu driving a [`Registry`] on behalf of one owner
pub struct Menu<R, W> {
    registry: Registry,
    owner_id: String,
    lines: Lines<R>,
    out: W,
}

impl<R, W> Menu<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(registry: Registry, owner_id: String, input: R, out: W) -> Self {
        Self {
            registry,
            owner_id,
            lines: input.lines(),
            out,
        }
    }

    /// Runs the menu until the user exits or input ends
    pub async fn run(&mut self) -> Result<()> {
        self.say("=== Short link service ===").await?;
        let banner = format!("Your user id: {}", self.owner_id);
        self.say(&banner).await?;
        self.say("").await?;

        loop {
            self.say("1. Create a short link").await?;
            self.say("2. Open a short link").await?;
            self.say("3. List my links").await?;
            self.say("4. Show statistics").await?;
            self.say("5. Exit").await?;
            let Some(raw) = self.prompt("Choose an option:").await? else {
                break;
            };

            match Choice::parse(&raw) {
                Some(Choice::Create) => self.create_link().await?,
                Some(Choice::Open) => self.open_link().await?,
                Some(Choice::List) => self.list_links().await?,
                Some(Choice::Stats) => self.show_stats().await?,
                Some(Choice::Exit) => {
                    self.say("Goodbye!").await?;
                    break;
                }
                None => self.say("Invalid choice. Pick an item from the menu.").await?,
            }
            self.say("").await?;
        }

        self.out.flush().await?;
        Ok(())
    }

    async fn create_link(&mut self) -> Result<()> {
        let Some(raw_target) = self.prompt("Enter URL:").await? else {
            return Ok(());
        };
        let target = match validate_target(&raw_target) {
            Ok(target) => target.to_string(),
            Err(msg) => return self.say(&format!("Error: {msg}")).await,
        };

        let Some(raw_limit) = self.prompt("Click limit:").await? else {
            return Ok(());
        };
        let click_limit = match parse_click_limit(&raw_limit) {
            Ok(limit) => limit,
            Err(msg) => return self.say(&format!("Error: {msg}")).await,
        };

        match self.registry.create(&target, &self.owner_id, click_limit) {
            Ok(code) => self.say(&format!("Short link created: {code}")).await,
            Err(e) => self.say(&format!("Error: {e}")).await,
        }
    }

    async fn open_link(&mut self) -> Result<()> {
        let Some(raw_code) = self.prompt("Enter short link code:").await? else {
            return Ok(());
        };
        let code = raw_code.trim();
        tracing::debug!("OPEN {}", truncate_code_for_log(code));

        match self.registry.consume(code, &self.owner_id) {
            Ok(target) => self.say(&format!("Redirecting to: {target}")).await,
            Err(e) => self.say(&format!("Error: {e}")).await,
        }
    }

    async fn list_links(&mut self) -> Result<()> {
        let links = self.registry.list_by_owner(&self.owner_id);
        if links.is_empty() {
            return self.say("No links found.").await;
        }

        self.say("\n=== Your links ===").await?;
        for link in &links {
            self.say(&describe(link)).await?;
        }
        Ok(())
    }

    async fn show_stats(&mut self) -> Result<()> {
        let total = format!("Links in the registry: {}", self.registry.total_count());
        let mine = format!(
            "Of which yours: {}",
            self.registry.count_by_owner(&self.owner_id)
        );
        self.say(&total).await?;
        self.say(&mine).await
    }

    /// Prints `text` and reads one line; `None` once input is exhausted
    async fn prompt(&mut self, text: &str) -> Result<Option<String>> {
        self.say(text).await?;
        self.out.flush().await?;
        Ok(self.lines.next_line().await?)
    }

    async fn say(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        Ok(())
    }
}

fn describe(link: &RecordSnapshot) -> String {
    format!(
        "Code: {}\n  URL: {}\n  Clicks: {}/{}\n  Expires at: {}",
        link.code,
        link.target,
        link.click_count,
        link.click_limit,
        format_time(link.expires_at)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::BufReader;

    async fn run_menu(registry: &Registry, owner_id: &str, input: &str) -> String {
        let mut out = Vec::new();
        {
            let mut menu = Menu::new(
                registry.clone(),
                owner_id.to_string(),
                BufReader::new(input.as_bytes()),
                &mut out,
            );
            menu.run().await.unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_truncate_code_for_log() {
        assert_eq!(truncate_code_for_log("abcdEFGH"), "abcdEFGH");
        assert_eq!(
            truncate_code_for_log("0123456789abcdefXYZ"),
            "0123456789abcdef..."
        );
    }

    #[test]
    fn test_validate_target() {
        assert_eq!(validate_target("  https://a.example \n"), Ok("https://a.example"));
        assert!(validate_target("   ").is_err());
        assert!(validate_target(&"x".repeat(MAX_TARGET_LENGTH + 1)).is_err());
    }

    #[test]
    fn test_parse_click_limit() {
        assert_eq!(parse_click_limit(" 3 "), Ok(3));
        assert!(parse_click_limit("0").is_err());
        assert!(parse_click_limit("-1").is_err());
        assert!(parse_click_limit("lots").is_err());
    }

    #[test]
    fn test_choice_parse() {
        assert_eq!(Choice::parse("1"), Some(Choice::Create));
        assert_eq!(Choice::parse(" 5 "), Some(Choice::Exit));
        assert_eq!(Choice::parse("9"), None);
    }

    #[tokio::test]
    async fn test_create_then_list() {
        let registry = Registry::new();
        let output = run_menu(&registry, "u1", "1\nhttps://a.example\n2\n3\n5\n").await;

        assert!(output.contains("Short link created: "));
        assert!(output.contains("URL: https://a.example"));
        assert!(output.contains("Clicks: 0/2"));
        assert!(output.contains("Goodbye!"));
        assert_eq!(registry.count_by_owner("u1"), 1);
    }

    #[tokio::test]
    async fn test_open_consumes_link() {
        let registry = Registry::new();
        let code = registry.create("https://a.example", "u1", 1).unwrap();

        let input = format!("2\n{code}\n2\n{code}\n5\n");
        let output = run_menu(&registry, "u1", &input).await;

        assert!(output.contains("Redirecting to: https://a.example"));
        assert!(output.contains("Error: click limit reached"));
        assert_eq!(registry.total_count(), 0);
    }

    #[tokio::test]
    async fn test_bad_input_keeps_running() {
        let registry = Registry::new();
        let output = run_menu(&registry, "u1", "7\n1\nhttps://a.example\nmany\n1\n\n2\nmissing0\n4\n").await;

        assert!(output.contains("Invalid choice"));
        assert!(output.contains("is not a valid click limit"));
        assert!(output.contains("Error: URL cannot be empty"));
        assert!(output.contains("short link not found: missing0"));
        assert!(output.contains("Links in the registry: 0"));
        assert_eq!(registry.total_count(), 0);
    }

    #[tokio::test]
    async fn test_stats_and_empty_list() {
        let registry = Registry::new();
        registry.create("https://other.example", "u2", 1).unwrap();

        let output = run_menu(&registry, "u1", "3\n4\n").await;

        assert!(output.contains("No links found."));
        assert!(output.contains("Links in the registry: 1"));
        assert!(output.contains("Of which yours: 0"));
    }
}
