use std::sync::Arc;

use crate::{errors::Error, Result};

use super::{
    client::{CommandRunner, TwtxtInvocationBuilder},
    filter::{self, GrepOptions},
    types::{CliFlavor, TwtxtCliConfig},
};

/// High-level twtxt operations used by the chat commands.
///
/// Every call is exactly one process invocation; listings are shaped in
/// process (line bounds, grep-style searches) rather than with shell pipes.
#[derive(Clone)]
pub struct Twtxt {
    invocations: TwtxtInvocationBuilder,
    runner: Arc<dyn CommandRunner>,
}

impl std::fmt::Debug for Twtxt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Twtxt")
            .field("invocations", &self.invocations)
            .finish_non_exhaustive()
    }
}

impl Twtxt {
    pub fn new(cfg: TwtxtCliConfig, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            invocations: TwtxtInvocationBuilder::new(cfg),
            runner,
        }
    }

    pub fn flavor(&self) -> CliFlavor {
        self.invocations.cfg.flavor
    }

    pub async fn tweet(&self, text: &str) -> Result<String> {
        self.runner.run(self.invocations.tweet(text)).await
    }

    /// The newest `entries` timeline entries.
    pub async fn timeline(&self, entries: usize) -> Result<String> {
        let out = self.runner.run(self.invocations.timeline()).await?;
        Ok(filter::take_entries(&out, entries).to_string())
    }

    /// Up to `entries` entries posted by `user`.
    pub async fn view_user(&self, user: &str, entries: usize) -> Result<String> {
        match self.flavor() {
            CliFlavor::Twtxt => {
                let out = self.runner.run(self.invocations.view(user)).await?;
                Ok(filter::take_entries(&out, entries).to_string())
            }
            // txtnish has no `view`: pick the author's headers out of the timeline.
            CliFlavor::Txtnish => {
                let pattern = filter::txtnish_author_pattern(user)?;
                self.search_timeline(
                    &pattern,
                    GrepOptions {
                        before: 0,
                        after: 1,
                        max_count: entries,
                    },
                )
                .await
            }
        }
    }

    /// Up to `entries` timeline entries mentioning `@nick`.
    pub async fn mentions(&self, nick: &str, entries: usize) -> Result<String> {
        let pattern = filter::literal_pattern(&format!("@{nick}"))?;
        self.search_timeline(&pattern, header_and_match(entries))
            .await
    }

    /// Up to `entries` timeline entries containing `#tag`.
    pub async fn tags(&self, tag: &str, entries: usize) -> Result<String> {
        let pattern = filter::literal_pattern(&format!("#{tag}"))?;
        self.search_timeline(&pattern, header_and_match(entries))
            .await
    }

    pub async fn follow(&self, user: &str, url: &str) -> Result<String> {
        self.runner.run(self.invocations.follow(user, url)).await
    }

    pub async fn unfollow(&self, user: &str) -> Result<String> {
        self.runner.run(self.invocations.unfollow(user)).await
    }

    pub async fn following(&self) -> Result<String> {
        self.runner.run(self.invocations.following()).await
    }

    async fn search_timeline(&self, pattern: &regex::Regex, opts: GrepOptions) -> Result<String> {
        let out = self.runner.run(self.invocations.timeline()).await?;
        filter::grep(&out, pattern, opts).ok_or(Error::NoMatches)
    }
}

/// Matching text line plus the entry header above it.
fn header_and_match(entries: usize) -> GrepOptions {
    GrepOptions {
        before: 1,
        after: 0,
        max_count: entries,
    }
}
