//! Star neighbour aggregation.
//!
//! Two repositories are neighbours when the same account starred both. For a
//! target repository we walk its stargazers, fetch what each of them starred,
//! and group those repositories by full name together with the stargazers
//! linking them to the target.

use crate::error::{Result, StarNeighboursError};
use crate::github::StarSource;
use futures::future;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use tracing::{debug, info};

pub const NO_STARGAZER_MESSAGE: &str = "This project has no stargazer";
pub const NO_NEIGHBOURS_MESSAGE: &str = "This repo has no neighbours";

/// A repository sharing at least one stargazer with the target
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeighbourEntry {
    pub repo: String,
    /// Logins in discovery order. A login may appear more than once.
    pub stargazers: Vec<String>,
}

/// Outcome of a neighbour lookup.
///
/// The two empty outcomes are successful results, not failures, and
/// serialize as the plain strings the API has always returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StarNeighbours {
    NoStargazers,
    NoNeighbours,
    Found(Vec<NeighbourEntry>),
}

impl StarNeighbours {
    pub fn entries(&self) -> &[NeighbourEntry] {
        match self {
            StarNeighbours::Found(entries) => entries,
            _ => &[],
        }
    }
}

impl Serialize for StarNeighbours {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            StarNeighbours::NoStargazers => serializer.serialize_str(NO_STARGAZER_MESSAGE),
            StarNeighbours::NoNeighbours => serializer.serialize_str(NO_NEIGHBOURS_MESSAGE),
            StarNeighbours::Found(entries) => entries.serialize(serializer),
        }
    }
}

/// Neighbour entries keyed by repository full name, kept in first-seen order
#[derive(Debug, Default)]
pub struct NeighbourSet {
    index: HashMap<String, usize>,
    entries: Vec<NeighbourEntry>,
}

impl NeighbourSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `stargazer` to `repo`, creating the entry on first sighting
    pub fn record(&mut self, repo: String, stargazer: &str) {
        match self.index.get(&repo) {
            Some(&position) => self.entries[position].stargazers.push(stargazer.to_string()),
            None => {
                self.index.insert(repo.clone(), self.entries.len());
                self.entries.push(NeighbourEntry {
                    repo,
                    stargazers: vec![stargazer.to_string()],
                });
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<NeighbourEntry> {
        self.entries
    }
}

/// Find the star neighbours of `user/repo`.
///
/// Starred lists are fetched with up to `concurrency` requests in flight but
/// merged strictly in stargazer order, so the output does not depend on
/// which response arrives first. The first upstream failure, in stargazer
/// order, aborts the whole lookup.
pub async fn find_star_neighbours<S>(
    source: &S,
    user: &str,
    repo: &str,
    concurrency: usize,
) -> Result<StarNeighbours>
where
    S: StarSource + ?Sized,
{
    let stargazers = source.list_stargazers(user, repo).await?;
    if stargazers.is_empty() {
        info!(user, repo, "Repository has no stargazers");
        return Ok(StarNeighbours::NoStargazers);
    }

    info!(user, repo, stargazers = stargazers.len(), "Collecting star neighbours");

    let target = format!("{}/{}", user, repo);
    let neighbours = stream::iter(stargazers)
        .map(move |stargazer| async move {
            let starred = source.list_starred(&stargazer.login).await?;
            debug!(login = %stargazer.login, starred = starred.len(), "Fetched starred repositories");
            Ok::<_, StarNeighboursError>((stargazer.login, starred))
        })
        .buffered(concurrency.max(1))
        .try_fold(NeighbourSet::new(), |mut set, (login, starred)| {
            for project in starred {
                if project.full_name != target {
                    set.record(project.full_name, &login);
                }
            }
            future::ready(Ok(set))
        })
        .await?;

    if neighbours.is_empty() {
        info!(user, repo, "Repository has no neighbours");
        return Ok(StarNeighbours::NoNeighbours);
    }

    info!(user, repo, neighbours = neighbours.len(), "Star neighbours collected");
    Ok(StarNeighbours::Found(neighbours.into_entries()))
}
