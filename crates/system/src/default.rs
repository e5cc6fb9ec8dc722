//! Process-wide default metrics system
//!
//! One shared [`MetricsSystem`] per process with explicit initialize and
//! teardown, plus the source-name uniquifier that keeps registrations
//! distinct when several identical components come up inside one process
//! (mini-cluster mode in tests).

use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::system::MetricsSystem;

#[derive(Default)]
struct GlobalState {
    system: Option<MetricsSystem>,
    mini_cluster: bool,
    names: HashMap<String, u32>,
}

fn global() -> &'static Mutex<GlobalState> {
    static GLOBAL: OnceLock<Mutex<GlobalState>> = OnceLock::new();
    GLOBAL.get_or_init(|| Mutex::new(GlobalState::default()))
}

/// Initialize (or re-initialize) the process-wide system under `prefix`
pub async fn initialize(prefix: &str) -> MetricsSystem {
    let system = {
        let mut state = global().lock();
        state
            .system
            .get_or_insert_with(|| MetricsSystem::new(prefix))
            .clone()
    };
    system.init(prefix).await;
    system
}

/// The process-wide system, if one was initialized
pub fn instance() -> Option<MetricsSystem> {
    global().lock().system.clone()
}

/// Shut the process-wide system down; true once fully torn down
pub async fn shutdown() -> bool {
    let system = global().lock().system.clone();
    let Some(system) = system else {
        return true;
    };
    let done = system.shutdown().await;
    if done {
        let mut state = global().lock();
        state.system = None;
        state.names.clear();
    }
    done
}

/// Allow repeated initialization of identically-named components
pub fn set_mini_cluster_mode(enabled: bool) {
    global().lock().mini_cluster = enabled;
}

pub fn in_mini_cluster_mode() -> bool {
    global().lock().mini_cluster
}

/// Reserve a source name
///
/// With `unique` requested, a name that was reserved before gets a
/// monotonically increasing `-N` suffix, keeping identically-named
/// components apart when several register before monitoring starts (tests
/// and mini clusters). Without it the name is returned as-is, so a live
/// re-registration reuses its name and replaces the earlier registration.
pub fn source_name(name: &str, unique: bool) -> String {
    let mut state = global().lock();
    let uses = state.names.entry(name.to_string()).or_insert(0);
    *uses += 1;
    if !unique || *uses == 1 {
        name.to_string()
    } else {
        format!("{}-{}", name, *uses - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_name_uniquification() {
        let base = source_name("UniqueNameTest", true);
        assert_eq!(base, "UniqueNameTest");
        assert_eq!(source_name("UniqueNameTest", true), "UniqueNameTest-1");
        assert_eq!(source_name("UniqueNameTest", true), "UniqueNameTest-2");
    }

    #[test]
    fn test_source_name_duplicates_allowed_when_not_unique() {
        assert_eq!(source_name("DupOkTest", false), "DupOkTest");
        assert_eq!(source_name("DupOkTest", false), "DupOkTest");
    }

    #[test]
    fn test_mini_cluster_toggle() {
        set_mini_cluster_mode(true);
        assert!(in_mini_cluster_mode());
        set_mini_cluster_mode(false);
        assert!(!in_mini_cluster_mode());
    }
}
