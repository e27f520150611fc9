use std::sync::OnceLock;

fn env_flag_enabled(name: &str) -> bool {
    std::env::var(name)
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}

/// Per-tick planner traces (`AH_DEBUG_PLANNER`), debug builds only.
pub fn planner_debug_enabled() -> bool {
    if !cfg!(debug_assertions) {
        return false;
    }
    static FLAG: OnceLock<bool> = OnceLock::new();
    *FLAG.get_or_init(|| env_flag_enabled("AH_DEBUG_PLANNER"))
}

/// Per-tick strategy traces (`AH_DEBUG_STRATEGY`), debug builds only.
pub fn strategy_debug_enabled() -> bool {
    if !cfg!(debug_assertions) {
        return false;
    }
    static FLAG: OnceLock<bool> = OnceLock::new();
    *FLAG.get_or_init(|| env_flag_enabled("AH_DEBUG_STRATEGY"))
}
