//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use mirage_api::error::GenerateResult;
use mirage_api::llm::TextGenerator;
use mirage_api::runtime::{
    ControllerOptions, Registry, SessionPhase, SimulationTiming, Simulator, VmController,
};

/// Text generator that replays queued replies and records every prompt.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<GenerateResult<String>>>,
    prompts: Mutex<Vec<String>>,
    delay: Duration,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait `delay` before answering each prompt.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn push_reply(&self, reply: GenerateResult<String>) {
        self.replies.lock().push_back(reply);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> GenerateResult<String> {
        self.prompts.lock().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }

    fn describe(&self) -> String {
        "scripted (test)".to_string()
    }
}

/// Timings short enough that a boot finishes in a few tens of milliseconds.
pub fn fast_timing() -> SimulationTiming {
    SimulationTiming {
        tick: Duration::from_millis(1),
        linux_settle: Duration::from_millis(5),
        windows_settle: Duration::from_millis(5),
        disk_activity: Duration::from_millis(20),
    }
}

/// Simulator over an empty catalog.
pub fn simulator(generator: Arc<ScriptedGenerator>, timing: SimulationTiming) -> Simulator {
    let controller = VmController::new(Registry::new(), ControllerOptions::default());
    Simulator::new(controller, generator, timing)
}

/// Poll until the session reaches Running.
pub async fn wait_for_running(sim: &Simulator) {
    for _ in 0..400 {
        if sim.read(|c| matches!(c.phase(), SessionPhase::Running(_))) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("machine never reached Running");
}
