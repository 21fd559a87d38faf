use rand::Rng;
use rand::rngs::SmallRng;
use rand_distr::Distribution;
use rand_distr::weighted::WeightedIndex;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::protocol::Protocol;

/// One unary call of the catalog gRPC service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrpcCall {
    GetAllUsers,
    GetAllSongs,
    GetUserPlaylists { id: i32 },
    GetPlaylistSongs { id: i32 },
    GetPlaylistsBySong { id: i32 },
}

/// One protocol adapter operation. Requests are fixed per scenario; only
/// the matching adapter variant knows how to execute each shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOp {
    HttpGet { path: String },
    Soap { operation: String, inner_xml: String },
    Graphql { query: String },
    Grpc { call: GrpcCall },
}

/// One named, weighted request operation.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: Arc<str>,
    pub weight: u32,
    pub op: TaskOp,
}

impl Task {
    fn new(name: &str, weight: u32, op: TaskOp) -> Self {
        Self {
            name: Arc::from(name),
            weight,
            op,
        }
    }
}

/// Weighted task pool for one simulated-user population.
///
/// Selection is memoryless: every pick is an independent draw with
/// P(task i) = weight_i / sum(weights). The randomness source is injected
/// so runs can be reproduced from a seed.
#[derive(Debug)]
pub struct TaskSet {
    tasks: Vec<Task>,
    dist: WeightedIndex<u32>,
}

impl TaskSet {
    pub fn new(tasks: Vec<Task>) -> Result<Self> {
        if tasks.is_empty() || tasks.iter().any(|t| t.weight == 0) {
            return Err(Error::InvalidWeights);
        }

        let dist = WeightedIndex::new(tasks.iter().map(|t| t.weight))
            .map_err(|_| Error::InvalidWeights)?;

        Ok(Self { tasks, dist })
    }

    pub fn pick(&self, rng: &mut SmallRng) -> &Task {
        &self.tasks[self.dist.sample(rng)]
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }
}

/// Uniformly random think-time within the configured range.
pub(crate) fn think_time(rng: &mut SmallRng, min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let ms = rng.random_range(min.as_millis() as u64..=max.as_millis() as u64);
    Duration::from_millis(ms)
}

fn graphql_query(name: &str, query: &str) -> (String, TaskOp) {
    (
        format!("GQL: {name}"),
        TaskOp::Graphql {
            query: query.to_string(),
        },
    )
}

/// The fixed benchmark scenario: the same five catalog reads per protocol,
/// weighted 1/1/2/2/2.
pub fn tasks_for(protocol: Protocol) -> Vec<Task> {
    match protocol {
        Protocol::Rest => {
            let get = |path: &str, weight| {
                Task::new(
                    path,
                    weight,
                    TaskOp::HttpGet {
                        path: path.to_string(),
                    },
                )
            };
            vec![
                get("/users", 1),
                get("/songs", 1),
                get("/users/1/playlists", 2),
                get("/playlists/1/songs", 2),
                get("/playlists/search?songId=1", 2),
            ]
        }
        Protocol::Soap => {
            let soap = |operation: &str, inner_xml: &str, weight| {
                Task::new(
                    &format!("SOAP: {operation}"),
                    weight,
                    TaskOp::Soap {
                        operation: operation.to_string(),
                        inner_xml: inner_xml.to_string(),
                    },
                )
            };
            vec![
                soap("getAllUsersRequest", "", 1),
                soap("getAllSongsRequest", "", 1),
                soap("getUserPlaylistsRequest", "<demo:userId>1</demo:userId>", 2),
                soap(
                    "getPlaylistSongsRequest",
                    "<demo:playlistId>1</demo:playlistId>",
                    2,
                ),
                soap(
                    "getPlaylistsBySongRequest",
                    "<demo:songId>1</demo:songId>",
                    2,
                ),
            ]
        }
        Protocol::Graphql => {
            let queries = [
                ("List Users", "{ users { id name } }", 1),
                ("List Songs", "{ songs { id title } }", 1),
                ("User Playlists", "{ userPlaylists(userId: 1) { id name } }", 2),
                (
                    "Playlist Songs",
                    "{ playlistSongs(playlistId: 1) { id title } }",
                    2,
                ),
                (
                    "Playlists by Song",
                    "{ playlistsBySong(songId: 1) { id name } }",
                    2,
                ),
            ];
            queries
                .into_iter()
                .map(|(name, query, weight)| {
                    let (name, op) = graphql_query(name, query);
                    Task::new(&name, weight, op)
                })
                .collect()
        }
        Protocol::Grpc => {
            let call = |name: &str, weight, call| Task::new(name, weight, TaskOp::Grpc { call });
            vec![
                call("GetAllUsers", 1, GrpcCall::GetAllUsers),
                call("GetAllSongs", 1, GrpcCall::GetAllSongs),
                call(
                    "GetUserPlaylists",
                    2,
                    GrpcCall::GetUserPlaylists { id: 1 },
                ),
                call(
                    "GetPlaylistSongs",
                    2,
                    GrpcCall::GetPlaylistSongs { id: 1 },
                ),
                call(
                    "GetPlaylistsBySong",
                    2,
                    GrpcCall::GetPlaylistsBySong { id: 1 },
                ),
            ]
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use rand::SeedableRng;

    #[test]
    fn every_protocol_has_the_five_scenario_tasks() {
        for protocol in Protocol::ALL {
            let tasks = tasks_for(protocol);
            assert_eq!(tasks.len(), 5, "{protocol}");
            let total: u32 = tasks.iter().map(|t| t.weight).sum();
            assert_eq!(total, 8, "{protocol}");
        }
    }

    #[test]
    fn empty_or_zero_weights_are_rejected() {
        assert!(matches!(TaskSet::new(vec![]), Err(Error::InvalidWeights)));

        let zero = vec![Task::new(
            "z",
            0,
            TaskOp::HttpGet {
                path: "/z".to_string(),
            },
        )];
        assert!(matches!(TaskSet::new(zero), Err(Error::InvalidWeights)));
    }

    #[test]
    fn weighted_selection_converges_to_configured_proportions() {
        let tasks = TaskSet::new(tasks_for(Protocol::Rest)).unwrap();
        let mut rng = SmallRng::seed_from_u64(42);

        const DRAWS: u64 = 50_000;
        let mut observed = vec![0u64; tasks.tasks().len()];
        for _ in 0..DRAWS {
            let picked = tasks.pick(&mut rng);
            let idx = tasks
                .tasks()
                .iter()
                .position(|t| Arc::ptr_eq(&t.name, &picked.name))
                .unwrap();
            observed[idx] += 1;
        }

        let total_weight: u32 = tasks.tasks().iter().map(|t| t.weight).sum();

        // Chi-square goodness of fit against the configured weights; 4
        // degrees of freedom, p=0.001 critical value is ~18.47.
        let mut chi2 = 0.0;
        for (idx, task) in tasks.tasks().iter().enumerate() {
            let expected = DRAWS as f64 * task.weight as f64 / total_weight as f64;
            let diff = observed[idx] as f64 - expected;
            chi2 += diff * diff / expected;
        }
        assert!(chi2 < 18.47, "chi2={chi2}, observed={observed:?}");
    }

    #[test]
    fn selection_is_deterministic_for_a_fixed_seed() {
        let tasks = TaskSet::new(tasks_for(Protocol::Graphql)).unwrap();

        let picks = |seed: u64| -> Vec<Arc<str>> {
            let mut rng = SmallRng::seed_from_u64(seed);
            (0..32).map(|_| tasks.pick(&mut rng).name.clone()).collect()
        };

        assert_eq!(picks(7), picks(7));
    }

    #[test]
    fn think_time_stays_within_range() {
        let mut rng = SmallRng::seed_from_u64(1);
        let min = Duration::from_millis(100);
        let max = Duration::from_millis(300);

        for _ in 0..1_000 {
            let t = think_time(&mut rng, min, max);
            assert!(t >= min && t <= max);
        }

        assert_eq!(think_time(&mut rng, max, max), max);
        assert_eq!(think_time(&mut rng, max, min), max);
    }
}
