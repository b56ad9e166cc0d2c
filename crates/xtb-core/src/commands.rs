//! Chat command dispatch.
//!
//! One inbound message produces at most one reply. Argument counts are taken
//! from whitespace splitting of the raw body (command word included) and there
//! is no quoting: `tw a   b` tweets `a b`.

use std::sync::Arc;

use crate::{
    config::Config, errors::Error, messaging::types::InboundMessage, security::is_authorized,
    twtxt::Twtxt,
};

pub const NOT_ALLOWED: &str = "You're not allowed to control me.";
pub const PONG: &str = "Pong!";
pub const SOURCE_URL: &str = "https://github.com/mdosch/goxtxt/";
pub const FAILED: &str = "Failed.";
pub const NO_INPUT: &str = "No Input.";
pub const MISSING_INPUT: &str = "Missing Input.";
pub const TOO_MANY_ARGUMENTS: &str = "Too many arguments.";
pub const ONE_USER_ONLY: &str = "Timeline view supports only one user.";
pub const WRONG_PARAMETER_COUNT: &str = "Wrong parameter count.";
pub const NO_MENTIONS: &str = "No mentions found.";
pub const UNKNOWN_COMMAND: &str = "Unknown command. Send \"help\".";

/// Characters of a `tw` body that are not part of the tweet (`tw `).
const TWEET_PREFIX_LEN: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandKind {
    Help,
    Ping,
    Source,
    Tweet,
    Timeline,
    View,
    Mentions,
    Tags,
    Follow,
    Unfollow,
    Following,
    Unknown,
}

impl CommandKind {
    pub fn from_keyword(keyword: &str) -> Self {
        match keyword.to_lowercase().as_str() {
            "help" => CommandKind::Help,
            "ping" => CommandKind::Ping,
            "source" => CommandKind::Source,
            "tw" => CommandKind::Tweet,
            "tl" => CommandKind::Timeline,
            "tv" => CommandKind::View,
            "tm" => CommandKind::Mentions,
            "tt" => CommandKind::Tags,
            "tf" => CommandKind::Follow,
            "tu" => CommandKind::Unfollow,
            "to" => CommandKind::Following,
            _ => CommandKind::Unknown,
        }
    }
}

/// A tokenized message body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Invocation {
    pub kind: CommandKind,
    pub keyword: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Split on whitespace; `None` for an empty body.
    pub fn parse(body: &str) -> Option<Self> {
        let mut words = body.split_whitespace();
        let keyword = words.next()?.to_string();
        Some(Self {
            kind: CommandKind::from_keyword(&keyword),
            keyword,
            args: words.map(str::to_string).collect(),
        })
    }
}

/// Interprets authorized chat messages and runs them against twtxt.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    cfg: Arc<Config>,
    twtxt: Arc<Twtxt>,
}

impl Dispatcher {
    pub fn new(cfg: Arc<Config>, twtxt: Arc<Twtxt>) -> Self {
        Self { cfg, twtxt }
    }

    /// Produce the reply for one inbound message.
    ///
    /// Returns `None` only for an authorized message with an empty body.
    pub async fn dispatch(&self, msg: &InboundMessage) -> Option<String> {
        if !is_authorized(&msg.from, &self.cfg.control_jid) {
            tracing::warn!(from = %msg.from, body = %msg.body, "rejected message from unauthorized sender");
            return Some(NOT_ALLOWED.to_string());
        }

        let inv = Invocation::parse(&msg.body)?;
        tracing::info!(from = %msg.from, command = %inv.keyword, args = inv.args.len(), "dispatching command");

        Some(self.run(&inv, &msg.body).await)
    }

    async fn run(&self, inv: &Invocation, body: &str) -> String {
        let entries = self.cfg.timeline_entries;
        let args = inv.args.as_slice();

        match inv.kind {
            CommandKind::Help => help_text(&self.cfg),
            CommandKind::Ping => PONG.to_string(),
            CommandKind::Source => SOURCE_URL.to_string(),

            CommandKind::Tweet => {
                if args.is_empty() {
                    return NO_INPUT.to_string();
                }
                if let Some(over) = tweet_overage(body, self.cfg.max_characters) {
                    return format!(
                        "Tweet exceeds maximum of {} characters by {over} characters.",
                        self.cfg.max_characters
                    );
                }
                if let Err(e) = self.twtxt.tweet(&args.join(" ")).await {
                    return failed("tweet", &e);
                }
                // A successful tweet answers with the refreshed timeline.
                self.timeline(entries).await
            }

            CommandKind::Timeline => self.timeline(entries).await,

            CommandKind::View => match args {
                [] => NO_INPUT.to_string(),
                [user] => or_failed("view", self.twtxt.view_user(user, entries).await),
                _ => ONE_USER_ONLY.to_string(),
            },

            CommandKind::Mentions => {
                let nick = match args {
                    [] => self.cfg.twtxt_nick.as_str(),
                    [user] => user.as_str(),
                    _ => return TOO_MANY_ARGUMENTS.to_string(),
                };
                match self.twtxt.mentions(nick, entries).await {
                    Ok(out) => out,
                    Err(Error::NoMatches) => NO_MENTIONS.to_string(),
                    Err(e) => failed("mentions", &e),
                }
            }

            CommandKind::Tags => match args {
                [] => MISSING_INPUT.to_string(),
                [tag] => or_failed("tags", self.twtxt.tags(tag, entries).await),
                _ => TOO_MANY_ARGUMENTS.to_string(),
            },

            CommandKind::Follow => match args {
                [user, url] => or_failed("follow", self.twtxt.follow(user, url).await),
                _ => MISSING_INPUT.to_string(),
            },

            CommandKind::Unfollow => match args {
                [user] => or_failed("unfollow", self.twtxt.unfollow(user).await),
                _ => WRONG_PARAMETER_COUNT.to_string(),
            },

            CommandKind::Following => or_failed("following", self.twtxt.following().await),

            CommandKind::Unknown => UNKNOWN_COMMAND.to_string(),
        }
    }

    async fn timeline(&self, entries: usize) -> String {
        or_failed("timeline", self.twtxt.timeline(entries).await)
    }
}

/// How far a `tw` body is over the limit, measured in UTF-8 bytes on the raw
/// body minus the `tw ` prefix (not on the re-joined arguments).
pub fn tweet_overage(body: &str, max_characters: usize) -> Option<usize> {
    let len = body.len().saturating_sub(TWEET_PREFIX_LEN);
    len.checked_sub(max_characters).filter(|over| *over > 0)
}

pub fn help_text(cfg: &Config) -> String {
    let n = cfg.timeline_entries;
    let nick = &cfg.twtxt_nick;
    format!(
        "\"help\": Show this message.\n\
         \"ping\": Bot replies if available.\n\
         \"tl\": Show last {n} timeline entries.\n\
         \"tv [user]\": Show [user]s timeline.\n\
         \"tw [tweet]\": Will tweet your input [tweet] and afterwards show your timeline.\n\
         \"tm [user]\": Will show the last {n} mentions. [user] will fall back  to \"{nick}\" if not specified.\n\
         \"tt [tag]\": Will show the last {n} occurrences of #[tag]\n\
         \"tf [user] [url]\": Follow [user].\n\
         \"tu [user]\": Unfollow [user].\n\
         \"to\": List the accounts you are following.\n\
         \"source\": Shows a link to the sourcecode."
    )
}

fn or_failed(op: &str, res: crate::Result<String>) -> String {
    match res {
        Ok(out) => out,
        Err(e) => failed(op, &e),
    }
}

fn failed(op: &str, e: &Error) -> String {
    tracing::warn!(op, error = %e, "twtxt command failed");
    FAILED.to_string()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::twtxt::{
        service::tests::{twtxt_with, FakeRunner},
        CliFlavor,
    };

    const CONTROLLER: &str = "me@example.org/laptop";

    const TIMELINE: &str = "\
* alice (now):
one @bob

* carol (1m):
two #rust

* dave (2m):
three

";

    fn config(entries: usize, max_characters: usize) -> Config {
        Config {
            address: None,
            bot_jid: "bot@example.org".to_string(),
            password: "secret".to_string(),
            control_jid: "me@example.org".to_string(),
            twtxt_nick: "bob".to_string(),
            timeline_entries: entries,
            max_characters,
            twtxt_path: PathBuf::from("/usr/local/bin/twtxt"),
            twtxt_flavor: CliFlavor::Twtxt,
        }
    }

    fn setup(runner: FakeRunner) -> (Dispatcher, Arc<FakeRunner>) {
        setup_with(runner, config(2, 140))
    }

    fn setup_with(runner: FakeRunner, cfg: Config) -> (Dispatcher, Arc<FakeRunner>) {
        let runner = Arc::new(runner);
        let twtxt = Arc::new(twtxt_with(runner.clone(), cfg.twtxt_flavor));
        (Dispatcher::new(Arc::new(cfg), twtxt), runner)
    }

    async fn send(d: &Dispatcher, body: &str) -> String {
        d.dispatch(&InboundMessage::new(CONTROLLER, body))
            .await
            .expect("reply")
    }

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_splits_on_any_whitespace() {
        let inv = Invocation::parse("  TW  hello \t world\n").unwrap();
        assert_eq!(inv.kind, CommandKind::Tweet);
        assert_eq!(inv.keyword, "TW");
        assert_eq!(inv.args, args(&["hello", "world"]));
        assert_eq!(Invocation::parse(" \n "), None);
    }

    #[test]
    fn overage_uses_raw_body_minus_three() {
        assert_eq!(tweet_overage("tw hello world", 11), None);
        assert_eq!(tweet_overage("tw hello world", 10), Some(1));
        // Runs of whitespace count even though the tweet is re-joined.
        assert_eq!(tweet_overage("tw hello   world", 11), Some(2));
    }

    #[test]
    fn overage_counts_utf8_bytes() {
        // "héllo" is five characters but six bytes.
        assert_eq!(tweet_overage("tw héllo", 6), None);
        assert_eq!(tweet_overage("tw héllo", 5), Some(1));
        assert_eq!(tweet_overage("tw 🦀", 2), Some(2));
    }

    #[tokio::test]
    async fn unauthorized_sender_is_rejected_without_running_twtxt() {
        let (d, runner) = setup(FakeRunner::with_stdout(TIMELINE));
        let reply = d
            .dispatch(&InboundMessage::new("mallory@example.org/x", "tl"))
            .await;
        assert_eq!(reply.as_deref(), Some(NOT_ALLOWED));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn empty_body_gets_no_reply() {
        let (d, _) = setup(FakeRunner::default());
        assert_eq!(d.dispatch(&InboundMessage::new(CONTROLLER, "   ")).await, None);
    }

    #[tokio::test]
    async fn static_replies() {
        let (d, runner) = setup(FakeRunner::default());
        assert_eq!(send(&d, "PING").await, PONG);
        assert_eq!(send(&d, "source").await, SOURCE_URL);
        assert_eq!(send(&d, "nope").await, UNKNOWN_COMMAND);

        let help = send(&d, "Help").await;
        assert!(help.starts_with("\"help\": Show this message.\n"));
        assert!(help.contains("\"tl\": Show last 2 timeline entries.\n"));
        assert!(help.contains("fall back  to \"bob\" if not specified."));
        assert!(help.ends_with("\"source\": Shows a link to the sourcecode."));
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn tweet_without_text() {
        let (d, runner) = setup(FakeRunner::default());
        assert_eq!(send(&d, "tw").await, NO_INPUT);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn tweet_over_length_reports_exact_overage() {
        let (d, runner) = setup_with(FakeRunner::default(), config(2, 5));
        // 14 chars - 3 = 11, limit 5 => 6 over.
        assert_eq!(
            send(&d, "tw hello world").await,
            "Tweet exceeds maximum of 5 characters by 6 characters."
        );
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn tweet_then_shows_bounded_timeline() {
        let (d, runner) = setup_with(FakeRunner::with_stdout(TIMELINE), config(1, 11));
        let reply = send(&d, "tw hello world").await;

        assert_eq!(
            runner.calls(),
            vec![args(&["tweet", "hello world"]), args(&["timeline"])]
        );
        assert_eq!(reply, "* alice (now):\none @bob\n\n");
    }

    #[tokio::test]
    async fn tweet_failure_skips_timeline() {
        let (d, runner) = setup(FakeRunner::failing());
        assert_eq!(send(&d, "tw hi").await, FAILED);
        assert_eq!(runner.calls(), vec![args(&["tweet", "hi"])]);
    }

    #[tokio::test]
    async fn timeline_failure() {
        let (d, _) = setup(FakeRunner::failing());
        assert_eq!(send(&d, "tl").await, FAILED);
    }

    #[tokio::test]
    async fn view_argument_checks() {
        let (d, runner) = setup(FakeRunner::with_stdout(TIMELINE));
        assert_eq!(send(&d, "tv").await, NO_INPUT);
        assert_eq!(send(&d, "tv alice bob").await, ONE_USER_ONLY);
        assert!(runner.calls().is_empty());

        send(&d, "tv alice").await;
        assert_eq!(runner.calls(), vec![args(&["view", "alice"])]);
    }

    #[tokio::test]
    async fn mentions_default_to_own_nick() {
        let (d, runner) = setup(FakeRunner::with_stdout(TIMELINE));
        assert_eq!(send(&d, "tm").await, "* alice (now):\none @bob\n");
        assert_eq!(runner.calls(), vec![args(&["timeline"])]);
    }

    #[tokio::test]
    async fn mentions_of_other_user_and_no_matches() {
        let (d, _) = setup(FakeRunner::with_stdout(TIMELINE));
        assert_eq!(send(&d, "tm carol").await, NO_MENTIONS);
        assert_eq!(send(&d, "tm a b").await, TOO_MANY_ARGUMENTS);
    }

    #[tokio::test]
    async fn mentions_tool_failure_is_failed() {
        let (d, _) = setup(FakeRunner::failing());
        assert_eq!(send(&d, "tm").await, FAILED);
    }

    #[tokio::test]
    async fn tags() {
        let (d, _) = setup(FakeRunner::with_stdout(TIMELINE));
        assert_eq!(send(&d, "tt").await, MISSING_INPUT);
        assert_eq!(send(&d, "tt a b").await, TOO_MANY_ARGUMENTS);
        assert_eq!(send(&d, "tt RUST").await, "* carol (1m):\ntwo #rust\n");
        assert_eq!(send(&d, "tt go").await, FAILED);
    }

    #[tokio::test]
    async fn follow_passes_user_and_url() {
        let (d, runner) = setup(FakeRunner::with_stdout("✓ You’re now following alice.\n"));
        assert_eq!(send(&d, "tf alice").await, MISSING_INPUT);
        assert_eq!(send(&d, "tf a b c").await, MISSING_INPUT);
        assert!(runner.calls().is_empty());

        let reply = send(&d, "tf alice https://example.com/alice").await;
        assert_eq!(reply, "✓ You’re now following alice.\n");
        assert_eq!(
            runner.calls(),
            vec![args(&["follow", "alice", "https://example.com/alice"])]
        );
    }

    #[tokio::test]
    async fn unfollow_and_following() {
        let (d, runner) = setup(FakeRunner::with_stdout("ok\n"));
        assert_eq!(send(&d, "tu").await, WRONG_PARAMETER_COUNT);
        assert_eq!(send(&d, "tu a b").await, WRONG_PARAMETER_COUNT);
        assert_eq!(send(&d, "tu alice").await, "ok\n");
        assert_eq!(send(&d, "TO").await, "ok\n");
        assert_eq!(
            runner.calls(),
            vec![args(&["unfollow", "alice"]), args(&["following"])]
        );
    }
}
