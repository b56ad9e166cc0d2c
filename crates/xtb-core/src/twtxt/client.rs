use async_trait::async_trait;

use crate::Result;

use super::types::*;

/// Port for executing one twtxt process and capturing its stdout.
///
/// Implementations must report spawn failures and non-zero exits as errors;
/// the dispatcher turns any error into a "Failed." reply.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, inv: CliInvocation) -> Result<String>;
}

/// Builds the argument vectors for each twtxt sub-command.
#[derive(Clone, Debug)]
pub struct TwtxtInvocationBuilder {
    pub cfg: TwtxtCliConfig,
}

impl TwtxtInvocationBuilder {
    pub fn new(cfg: TwtxtCliConfig) -> Self {
        Self { cfg }
    }

    fn build<I, S>(&self, args: I) -> CliInvocation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CliInvocation {
            program: self.cfg.program.clone(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `tweet <text>`; the text is one argument no matter what it contains.
    pub fn tweet(&self, text: &str) -> CliInvocation {
        self.build(["tweet", text])
    }

    pub fn timeline(&self) -> CliInvocation {
        self.build(["timeline"])
    }

    pub fn view(&self, user: &str) -> CliInvocation {
        self.build(["view", user])
    }

    pub fn follow(&self, user: &str, url: &str) -> CliInvocation {
        self.build(["follow", user, url])
    }

    pub fn unfollow(&self, user: &str) -> CliInvocation {
        self.build(["unfollow", user])
    }

    pub fn following(&self) -> CliInvocation {
        self.build(["following"])
    }
}
