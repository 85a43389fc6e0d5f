//! Scenario scripts.
//!
//! A script names a set of accounts, optionally seeds relationships between
//! them, and lists the commands to run in order:
//!
//! ```toml
//! name = "request then decline"
//! accounts = ["alice", "bob"]
//!
//! [seed]
//! follows = [["bob", "alice"]]
//!
//! [[steps]]
//! actor = "alice"
//! action = "send_friend_request"
//! subject = "bob"
//! message = "hi"
//! expect = "request_sent"
//!
//! [[steps]]
//! actor = "bob"
//! action = "decline_friend_request"
//! subject = "alice"
//! fail = false
//! ```
//!
//! `expect` takes a relationship status or an error kind. `fail = true` makes
//! the service reject the step's call.

use crate::error::{CliError, Result};
use rapport_domain::{RelationshipStatus, Transition};
use rapport_processor::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Raw script as written in TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Script {
    /// Optional scenario title
    #[serde(default)]
    pub name: Option<String>,

    /// Account names, in display order
    pub accounts: Vec<String>,

    /// Relationships in place before the first step
    #[serde(default)]
    pub seed: Seed,

    /// Commands to run in order
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Initial relationships, applied directly to the service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seed {
    /// Pairs that start as friends
    #[serde(default)]
    pub friendships: Vec<[String; 2]>,

    /// `[follower, followee]` pairs
    #[serde(default)]
    pub follows: Vec<[String; 2]>,
}

/// One scripted command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Acting account name
    pub actor: String,

    /// Transition name, e.g. `accept_friend_request`
    pub action: String,

    /// Target account name
    pub subject: String,

    /// Friend request message
    #[serde(default)]
    pub message: Option<String>,

    /// Expected status or error kind
    #[serde(default)]
    pub expect: Option<String>,

    /// Make the service fail this step's call
    #[serde(default)]
    pub fail: bool,
}

/// What a step is expected to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expectation {
    /// Success with this status
    Status(RelationshipStatus),
    /// Failure of this kind
    Error(ErrorKind),
}

impl Expectation {
    /// Parse a status tag or an error kind tag
    pub fn parse(s: &str) -> Option<Self> {
        RelationshipStatus::parse(s)
            .map(Expectation::Status)
            .or_else(|| ErrorKind::parse(s).map(Expectation::Error))
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expectation::Status(status) => write!(f, "{}", status),
            Expectation::Error(kind) => write!(f, "{}", kind),
        }
    }
}

/// A validated step, with accounts resolved to indexes into [`Scenario::accounts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    /// Acting account index
    pub actor: usize,
    /// Target account index
    pub subject: usize,
    /// Command to run
    pub transition: Transition,
    /// Friend request message
    pub message: Option<String>,
    /// Expected result
    pub expect: Option<Expectation>,
    /// Arm one service failure before the step
    pub fail: bool,
}

/// A validated script, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    /// Optional scenario title
    pub name: Option<String>,
    /// Account names, in display order
    pub accounts: Vec<String>,
    /// Seeded friendships as index pairs
    pub friendships: Vec<(usize, usize)>,
    /// Seeded follows as `(follower, followee)` index pairs
    pub follows: Vec<(usize, usize)>,
    /// Steps in order
    pub steps: Vec<PlannedStep>,
}

impl Script {
    /// Read a script from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse a script from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validate the script and resolve names.
    ///
    /// A step may name the same account as actor and subject; running it
    /// reports `invalid_target`.
    pub fn plan(&self) -> Result<Scenario> {
        if self.accounts.is_empty() {
            return Err(CliError::Script("no accounts declared".to_string()));
        }

        let mut index = HashMap::new();
        for (i, name) in self.accounts.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(CliError::Script(format!("account {} has a blank name", i + 1)));
            }
            if index.insert(name.as_str(), i).is_some() {
                return Err(CliError::Script(format!("account '{}' declared twice", name)));
            }
        }

        let lookup = |name: &str, context: &str| -> Result<usize> {
            index.get(name).copied().ok_or_else(|| {
                CliError::Script(format!("{}: unknown account '{}'", context, name))
            })
        };

        let mut friendships = Vec::new();
        for [a, b] in &self.seed.friendships {
            let pair = (lookup(a, "seed.friendships")?, lookup(b, "seed.friendships")?);
            if pair.0 == pair.1 {
                return Err(CliError::Script(format!("'{}' cannot befriend itself", a)));
            }
            friendships.push(pair);
        }

        let mut follows = Vec::new();
        for [follower, followee] in &self.seed.follows {
            let pair = (
                lookup(follower, "seed.follows")?,
                lookup(followee, "seed.follows")?,
            );
            if pair.0 == pair.1 {
                return Err(CliError::Script(format!("'{}' cannot follow itself", follower)));
            }
            follows.push(pair);
        }

        let mut steps = Vec::with_capacity(self.steps.len());
        for (i, step) in self.steps.iter().enumerate() {
            let context = format!("step {}", i + 1);
            let transition = Transition::parse(&step.action).ok_or_else(|| {
                CliError::Script(format!("{}: unknown action '{}'", context, step.action))
            })?;
            let expect = match &step.expect {
                Some(tag) => Some(Expectation::parse(tag).ok_or_else(|| {
                    CliError::Script(format!("{}: unknown expectation '{}'", context, tag))
                })?),
                None => None,
            };

            steps.push(PlannedStep {
                actor: lookup(&step.actor, &context)?,
                subject: lookup(&step.subject, &context)?,
                transition,
                message: step.message.clone(),
                expect,
                fail: step.fail,
            });
        }

        Ok(Scenario {
            name: self.name.clone(),
            accounts: self.accounts.clone(),
            friendships,
            follows,
            steps,
        })
    }
}
