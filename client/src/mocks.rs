//! Test doubles for the orchestrator's collaborators.
//!
//! [MockContract] runs every call against a [CalibrationLedger] and can be
//! told to fail, to hold calls at a gate, or to script an exit answer.
//! [MockProver] returns deterministic proofs. [ManualClock] only moves when
//! told to (or when something sleeps on it). [RecordingObserver] keeps every
//! notification.

use crate::{
    clock::Clock,
    contract::{Contract, Submission},
    observer::Observer,
    prover::{ProofRequest, Prover},
};
use bytes::Bytes;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sabirth_execution::mocks::CalibrationLedger;
use sabirth_types::{Address, CalibrationSession, ContractError, LeaderboardEntry, ProofArtifact};
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};
use thiserror::Error;
use tokio::sync::Notify;

/// Error returned by [MockContract].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    /// The contract rejected the call.
    #[error("contract rejected the call: {0}")]
    Contract(#[from] ContractError),
    /// The call never reached the contract.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Contract entry points, for call logs and fault injection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Method {
    StartSession,
    SetCharacter,
    SubmitSenseCompletion,
    AttemptExit,
    GetSession,
    GetLeaderboard,
}

#[derive(Default)]
struct Faults {
    /// Remaining forced transport failures per method.
    next: HashMap<Method, u32>,
    /// Probability of a transport failure per method.
    rates: HashMap<Method, f64>,
    rng: Option<ChaCha20Rng>,
    exit_answer: Option<(bool, u64)>,
    assigned_session_id: Option<u32>,
}

/// Holds calls until opened.
#[derive(Default)]
struct Gate {
    closed: AtomicBool,
    notify: Notify,
}

impl Gate {
    async fn pass(&self) {
        loop {
            let notified = self.notify.notified();
            if !self.closed.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

#[derive(Clone, Default)]
pub struct MockContract {
    ledger: Arc<Mutex<CalibrationLedger>>,
    calls: Arc<Mutex<Vec<Method>>>,
    submissions: Arc<Mutex<Vec<Submission>>>,
    faults: Arc<Mutex<Faults>>,
    gate: Arc<Gate>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl MockContract {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` calls to `method` with a transport error.
    pub fn fail_next(&self, method: Method, times: u32) {
        self.faults.lock().unwrap().next.insert(method, times);
    }

    /// Fail calls to `method` at random with probability `rate`.
    pub fn fail_randomly(&self, method: Method, rate: f64, seed: u64) {
        let mut faults = self.faults.lock().unwrap();
        faults.rates.insert(method, rate);
        faults
            .rng
            .get_or_insert_with(|| ChaCha20Rng::seed_from_u64(seed));
    }

    /// Answer `attempt_exit` with `answer` (the session is still closed).
    pub fn script_exit(&self, success: bool, total_score: u64) {
        self.faults.lock().unwrap().exit_answer = Some((success, total_score));
    }

    /// Store sessions under `session_id` regardless of the id requested.
    pub fn assign_session_id(&self, session_id: u32) {
        self.faults.lock().unwrap().assigned_session_id = Some(session_id);
    }

    /// Hold every call until [Self::open_gate].
    pub fn close_gate(&self) {
        self.gate.closed.store(true, Ordering::SeqCst);
    }

    pub fn open_gate(&self) {
        self.gate.closed.store(false, Ordering::SeqCst);
        self.gate.notify.notify_waiters();
    }

    /// Yield until at least `count` calls are in flight.
    pub async fn wait_for_in_flight(&self, count: usize) {
        while self.in_flight.load(Ordering::SeqCst) < count {
            tokio::task::yield_now().await;
        }
    }

    pub fn calls(&self) -> Vec<Method> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, method: Method) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| **call == method)
            .count()
    }

    /// Submissions that reached the ledger (accepted or not).
    pub fn submissions(&self) -> Vec<Submission> {
        self.submissions.lock().unwrap().clone()
    }

    /// Most calls ever in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn ledger(&self) -> CalibrationLedger {
        self.ledger.lock().unwrap().clone()
    }

    /// Log the call, wait at the gate and apply any injected fault.
    async fn enter(&self, method: Method) -> Result<InFlight, LedgerError> {
        self.calls.lock().unwrap().push(method);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        let guard = InFlight(self.in_flight.clone());
        self.gate.pass().await;

        let mut faults = self.faults.lock().unwrap();
        if let Some(remaining) = faults.next.get_mut(&method) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(LedgerError::Transport(format!("{method:?} timed out")));
            }
        }
        if let Some(rate) = faults.rates.get(&method).copied() {
            if let Some(rng) = faults.rng.as_mut() {
                if rng.gen_bool(rate) {
                    return Err(LedgerError::Transport(format!("{method:?} dropped")));
                }
            }
        }
        Ok(guard)
    }
}

struct InFlight(Arc<AtomicUsize>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Contract for MockContract {
    type Error = LedgerError;

    async fn start_session(
        &self,
        session_id: u32,
        player1: Address,
        player2: Address,
        player1_points: i128,
        player2_points: i128,
    ) -> Result<(), Self::Error> {
        let _in_flight = self.enter(Method::StartSession).await?;
        let session_id = self
            .faults
            .lock()
            .unwrap()
            .assigned_session_id
            .unwrap_or(session_id);
        self.ledger.lock().unwrap().start_session(
            session_id,
            &player1,
            &player2,
            player1_points,
            player2_points,
        )?;
        Ok(())
    }

    async fn set_character(&self, player: Address, character: u32) -> Result<u32, Self::Error> {
        let _in_flight = self.enter(Method::SetCharacter).await?;
        Ok(self.ledger.lock().unwrap().set_character(&player, character)?)
    }

    async fn submit_sense_completion(&self, submission: Submission) -> Result<(), Self::Error> {
        let _in_flight = self.enter(Method::SubmitSenseCompletion).await?;
        self.submissions.lock().unwrap().push(submission.clone());
        self.ledger.lock().unwrap().submit_sense_completion(
            &submission.player,
            submission.sense.index(),
            submission.maze_id,
            submission.points,
            submission.time_ms,
            submission.score,
            &submission.proof,
        )?;
        Ok(())
    }

    async fn attempt_exit(&self, player: Address) -> Result<(bool, u64), Self::Error> {
        let _in_flight = self.enter(Method::AttemptExit).await?;
        let answer = self.ledger.lock().unwrap().attempt_exit(&player)?;
        Ok(self.faults.lock().unwrap().exit_answer.unwrap_or(answer))
    }

    async fn get_session(&self, player: Address) -> Result<Option<CalibrationSession>, Self::Error> {
        let _in_flight = self.enter(Method::GetSession).await?;
        Ok(self.ledger.lock().unwrap().get_session(&player))
    }

    async fn get_leaderboard(&self) -> Result<Vec<LeaderboardEntry>, Self::Error> {
        let _in_flight = self.enter(Method::GetLeaderboard).await?;
        Ok(self.ledger.lock().unwrap().get_leaderboard())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("proof generation failed: {0}")]
pub struct ProverError(pub String);

#[derive(Default)]
struct ProverState {
    requests: Vec<ProofRequest>,
    fail_next: u32,
    rate: f64,
    rng: Option<ChaCha20Rng>,
}

/// Prover that returns a deterministic artifact for every request.
#[derive(Clone, Default)]
pub struct MockProver {
    state: Arc<Mutex<ProverState>>,
}

impl MockProver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, times: u32) {
        self.state.lock().unwrap().fail_next = times;
    }

    pub fn fail_randomly(&self, rate: f64, seed: u64) {
        let mut state = self.state.lock().unwrap();
        state.rate = rate;
        state.rng = Some(ChaCha20Rng::seed_from_u64(seed));
    }

    pub fn requests(&self) -> Vec<ProofRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

impl Prover for MockProver {
    type Error = ProverError;

    async fn generate_proof(&self, request: ProofRequest) -> Result<ProofArtifact, Self::Error> {
        {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request);
            if state.fail_next > 0 {
                state.fail_next -= 1;
                return Err(ProverError("witness generation failed".to_string()));
            }
            let rate = state.rate;
            if let Some(rng) = state.rng.as_mut() {
                if rng.gen_bool(rate) {
                    return Err(ProverError("prover crashed".to_string()));
                }
            }
        }
        tokio::task::yield_now().await;

        let mut proof = Vec::with_capacity(12);
        proof.extend_from_slice(&request.score.to_be_bytes());
        proof.extend_from_slice(&request.maze_id.raw().to_be_bytes());
        Ok(ProofArtifact {
            proof: Bytes::from(proof),
            public_inputs: request.public_inputs(),
            verified: true,
            maze_id: request.maze_id,
            score: request.score,
        })
    }
}

/// Clock that only moves when advanced. Sleeping jumps straight to the
/// deadline.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn advance(&self, ms: u64) -> u64 {
        self.now.fetch_add(ms, Ordering::SeqCst) + ms
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }

    async fn sleep_until(&self, deadline_ms: u64) {
        self.now.fetch_max(deadline_ms, Ordering::SeqCst);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notification {
    Awaken(u32),
    GameComplete,
    StandingsRefresh,
}

#[derive(Clone, Debug, Default)]
pub struct RecordingObserver {
    seen: Arc<Mutex<Vec<Notification>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.seen.lock().unwrap().clear();
    }
}

impl Observer for RecordingObserver {
    fn awaken(&self, character: u32) {
        self.seen.lock().unwrap().push(Notification::Awaken(character));
    }

    fn game_complete(&self) {
        self.seen.lock().unwrap().push(Notification::GameComplete);
    }

    fn standings_refresh(&self) {
        self.seen.lock().unwrap().push(Notification::StandingsRefresh);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sabirth_types::{Character, MazeId, Sense};

    fn player() -> Address {
        Address::new("GPLAYER")
    }

    #[tokio::test]
    async fn test_contract_mirrors_ledger() {
        let contract = MockContract::new();
        contract
            .start_session(5, player(), Address::new("GHOUSE"), 10, 10)
            .await
            .unwrap();
        assert_eq!(contract.set_character(player(), 1).await, Ok(5));
        assert_eq!(
            contract.set_character(player(), 9).await,
            Err(LedgerError::Contract(ContractError::InvalidCharacter))
        );
        assert_eq!(
            contract.calls(),
            vec![Method::StartSession, Method::SetCharacter, Method::SetCharacter]
        );
        let session = contract.get_session(player()).await.unwrap().unwrap();
        assert_eq!(session.character, 1);
    }

    #[tokio::test]
    async fn test_fail_next() {
        let contract = MockContract::new();
        contract.fail_next(Method::GetLeaderboard, 1);
        assert!(matches!(
            contract.get_leaderboard().await,
            Err(LedgerError::Transport(_))
        ));
        assert_eq!(contract.get_leaderboard().await, Ok(vec![]));
        assert_eq!(contract.call_count(Method::GetLeaderboard), 2);
    }

    #[tokio::test]
    async fn test_gate_holds_calls() {
        let contract = MockContract::new();
        contract.close_gate();
        let task = {
            let contract = contract.clone();
            tokio::spawn(async move { contract.get_leaderboard().await })
        };
        contract.wait_for_in_flight(1).await;
        assert!(!task.is_finished());
        contract.open_gate();
        assert_eq!(task.await.unwrap(), Ok(vec![]));
        assert_eq!(contract.max_in_flight(), 1);
    }

    #[tokio::test]
    async fn test_assigned_session_id() {
        let contract = MockContract::new();
        contract.assign_session_id(77);
        contract
            .start_session(5, player(), Address::new("GHOUSE"), 10, 10)
            .await
            .unwrap();
        assert_eq!(contract.set_character(player(), 0).await, Ok(77));
    }

    #[tokio::test]
    async fn test_prover() {
        let prover = MockProver::new();
        let request = ProofRequest {
            points: 2,
            time_ms: 3,
            score: 6,
            maze_id: MazeId::new(Character::Carol, Sense::Touch),
        };
        prover.fail_next(1);
        assert!(prover.generate_proof(request).await.is_err());
        let artifact = prover.generate_proof(request).await.unwrap();
        assert_eq!(artifact.score, 6);
        assert_eq!(artifact.maze_id, request.maze_id);
        assert_eq!(artifact.proof.len(), 12);
        assert!(artifact.verified);
        assert_eq!(prover.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_manual_clock() {
        let clock = ManualClock::new(100);
        assert_eq!(clock.advance(50), 150);
        clock.sleep_until(120).await;
        assert_eq!(clock.now_ms(), 150);
        clock.sleep_until(1_000).await;
        assert_eq!(clock.now_ms(), 1_000);
    }
}
