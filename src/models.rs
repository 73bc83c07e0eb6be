use serde::{Deserialize, Serialize};

use crate::throttle::LoadpointId;

// ?lp= on every loadpoint scoped route
#[derive(Deserialize, Debug, Default)]
pub struct LpQuery {
    pub lp: Option<LoadpointId>,
}

impl LpQuery {
    pub fn or(&self, default_lp: LoadpointId) -> LoadpointId {
        self.lp.unwrap_or(default_lp)
    }
}

// 429 body
#[derive(Serialize, Debug)]
pub struct ThrottledBody {
    pub error: &'static str,
    pub detail: String,
    pub retry_after_seconds: u64,
    pub cooldown_seconds: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CooldownStatus {
    pub lp: LoadpointId,
    pub remaining: u64,
    pub window: u64,
    pub last_mode: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ModeChanged {
    pub lp: LoadpointId,
    pub mode: String,
    pub evcc: String, // raw evcc reply
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MaxCurrentChanged {
    pub lp: LoadpointId,
    pub maxcurrent: u32,
    pub evcc: String,
}
