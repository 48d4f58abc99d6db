//! Session orchestrator.
//!
//! The [Orchestrator] drives a [SessionMachine] from player events and talks
//! to the contract and prover. Two kinds of calls are made:
//!
//! - Detached: session start and the per-sense proof/submission pipeline.
//!   They are spawned, may outlive the screen that started them and only
//!   report back through the report channel. Their failures surface as
//!   [Orchestrator::last_error] and never change the phase.
//! - Awaited: the exit call, whose answer picks the terminal phase.
//!
//! Every on-chain call runs under the shared [ActionLock].

use crate::{
    clock::Clock,
    config::ValidatedConfig,
    contract::{Contract, Submission},
    lock::{ActionKind, ActionLock},
    observer::Observer,
    prover::{ProofRequest, Prover},
    reconcile::Reconciliation,
    report::{self, Epoch, Report, ReportReceiver, ReportSender},
    Error, Result,
};
use futures::StreamExt;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sabirth_execution::{
    leaderboard::{rank, Ranked},
    maze::MazeRun,
    Commit, ExitRequest, MazeCompletion, SessionMachine, SessionStart, Settlement,
    TransitionError, Verdict,
};
use sabirth_types::{Address, Character, GamePhase, Sense, SenseOutcome};
use std::future::Future;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Clears the exit-in-progress flag when a settling exit is dropped before
/// the verdict lands, so the player stays at the hub and may try again.
struct PendingExit<'a> {
    machine: &'a mut SessionMachine,
    settled: bool,
}

impl Drop for PendingExit<'_> {
    fn drop(&mut self) {
        if !self.settled && self.machine.exit_in_progress() {
            warn!("exit dropped before settling");
            let _ = self.machine.abandon_exit();
        }
    }
}

/// Result of an exit attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Not every sense is calibrated; the player must confirm.
    ConfirmationShown,
    /// An exit is already pending.
    Ignored,
    /// Another on-chain action held the lock; the player stays at the hub.
    Busy,
    Settled {
        verdict: Verdict,
        settlement: Settlement,
    },
}

pub struct Orchestrator<C, P, K, O>
where
    C: Contract,
    P: Prover,
    K: Clock,
    O: Observer,
{
    config: ValidatedConfig,
    contract: C,
    prover: P,
    clock: K,
    observer: O,

    machine: SessionMachine,
    rng: ChaCha20Rng,
    lock: ActionLock,
    /// Start time of the run handed out by the last `enter_maze`.
    run_started_ms: Option<u64>,

    epoch: Epoch,
    sender: ReportSender,
    receiver: ReportReceiver,
    tasks: Vec<JoinHandle<()>>,
    last_error: Option<String>,
}

impl<C, P, K, O> Orchestrator<C, P, K, O>
where
    C: Contract,
    P: Prover,
    K: Clock,
    O: Observer,
{
    pub fn new(config: ValidatedConfig, contract: C, prover: P, clock: K, observer: O) -> Self {
        let mut rng = match config.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        };
        let machine = SessionMachine::new(config.display, &mut rng);
        let (sender, receiver) = report::channel();
        Self {
            config,
            contract,
            prover,
            clock,
            observer,
            machine,
            rng,
            lock: ActionLock::new(),
            run_started_ms: None,
            epoch: 0,
            sender,
            receiver,
            tasks: Vec::new(),
            last_error: None,
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.machine.phase()
    }

    pub fn machine(&self) -> &SessionMachine {
        &self.machine
    }

    pub fn lock(&self) -> &ActionLock {
        &self.lock
    }

    pub fn clock(&self) -> &K {
        &self.clock
    }

    pub fn player(&self) -> &Address {
        &self.config.player
    }

    /// Most recent error from a background or exit call, cleared when a new
    /// action starts.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.retain(|handle| !handle.is_finished());
        self.tasks.push(tokio::spawn(task));
    }

    /// Apply every report received so far. Returns how many were applied.
    pub fn apply_reports(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(report) = self.receiver.try_recv() {
            self.apply(report);
            applied += 1;
        }
        applied
    }

    /// Wait for the next report and apply it.
    pub async fn next_report(&mut self) -> Option<Report> {
        let report = self.receiver.next().await?;
        self.apply(report.clone());
        Some(report)
    }

    /// Wait for every detached task to finish, then apply their reports.
    pub async fn flush(&mut self) {
        for handle in std::mem::take(&mut self.tasks) {
            if let Err(err) = handle.await {
                error!(?err, "background task failed");
            }
        }
        self.apply_reports();
    }

    fn apply(&mut self, report: Report) {
        if report.epoch() != self.epoch {
            debug!(epoch = report.epoch(), current = self.epoch, "ignoring stale report");
            return;
        }
        if let Some(error) = report.error() {
            self.last_error = Some(error.to_string());
        }
        let finished = report.finishes();
        match report {
            Report::SessionOpened { session_id, .. } => {
                if session_id != self.machine.session_id() {
                    info!(
                        local = self.machine.session_id(),
                        session_id, "adopting contract session id"
                    );
                }
                self.machine.adopt_session_id(session_id);
                self.observer.standings_refresh();
            }
            Report::ProofReady { sense, proof, .. } => {
                if !self.machine.attach_proof(sense, proof) {
                    debug!(%sense, "proof not attached");
                }
            }
            _ => {}
        }
        if let Some(sense) = finished {
            match self.machine.commit_sense(sense) {
                Commit::Committed { score, total_score } => {
                    info!(%sense, score, total_score, "sense committed")
                }
                commit => debug!(%sense, ?commit, "sense commit skipped"),
            }
        }
    }

    pub fn acknowledge_intro(&mut self) -> Result<()> {
        self.machine.acknowledge_intro()?;
        Ok(())
    }

    /// Pick a character and open the on-chain session in the background.
    pub fn select_character(&mut self, character: Character) -> Result<SessionStart> {
        let start = self
            .machine
            .select_character(character, self.clock.now_ms())?;
        info!(session_id = start.session_id, %character, "character selected");
        self.last_error = None;

        let task = open_session(
            self.contract.clone(),
            self.lock.clone(),
            self.sender.clone(),
            self.epoch,
            start,
            self.config.player.clone(),
            self.config.house.clone(),
            self.config.stake_points,
        );
        self.spawn(task);
        Ok(start)
    }

    /// Sleep on the clock until the current timed screen may be dismissed.
    pub async fn wait_for_display(&self) {
        if let Some(deadline) = self.machine.display_deadline() {
            self.clock.sleep_until(deadline).await;
        }
    }

    pub fn confirm_lore(&mut self) -> Result<()> {
        self.machine.confirm_lore(self.clock.now_ms())?;
        Ok(())
    }

    /// Enter the maze for `sense` and start a run.
    pub fn enter_maze(&mut self, sense: Sense) -> Result<MazeRun> {
        self.apply_reports();
        let maze_id = self.machine.enter_maze(sense)?;
        let character = self
            .machine
            .character()
            .ok_or(TransitionError::NoCharacter)?;
        debug!(%sense, %maze_id, "maze entered");
        let run = MazeRun::new(character, sense, self.clock.now_ms());
        self.run_started_ms = Some(run.started_ms());
        Ok(run)
    }

    pub fn abort_maze(&mut self) -> Result<()> {
        self.machine.abort_maze()?;
        Ok(())
    }

    /// Finish `run` at the current time. The run must be the one handed out
    /// for the open maze and must stand on an open goal.
    pub fn finish_run(&mut self, run: &MazeRun) -> Result<MazeCompletion> {
        let owned = self.machine.current_maze() == Some(run.sense())
            && self.machine.character() == Some(run.character())
            && self.run_started_ms == Some(run.started_ms());
        if !owned {
            return Err(TransitionError::RunMismatch.into());
        }
        if !run.at_goal() {
            return Err(TransitionError::GoalNotReached.into());
        }
        self.complete_maze(run.finish(self.clock.now_ms()))
    }

    /// Report a finished run. An accepted run starts the proof and
    /// submission pipeline in the background.
    pub fn complete_maze(&mut self, outcome: SenseOutcome) -> Result<MazeCompletion> {
        let completion = self.machine.complete_maze(outcome, self.clock.now_ms())?;
        match completion {
            MazeCompletion::Accepted {
                sense,
                maze_id,
                points,
                time_ms,
                score,
                prove,
            } => {
                info!(%sense, %maze_id, points, time_ms, score, "maze complete");
                if prove {
                    self.last_error = None;
                    let task = prove_and_submit(
                        self.contract.clone(),
                        self.prover.clone(),
                        self.lock.clone(),
                        self.sender.clone(),
                        self.epoch,
                        self.config.player.clone(),
                        sense,
                        ProofRequest {
                            points,
                            time_ms,
                            score,
                            maze_id,
                        },
                    );
                    self.spawn(task);
                } else {
                    self.machine.commit_sense(sense);
                }
            }
            MazeCompletion::Failed { sense, score } => {
                info!(%sense, score, "sense failed: score above cap");
            }
            MazeCompletion::Duplicate => {}
        }
        Ok(completion)
    }

    pub fn confirm_integration(&mut self) -> Result<Commit> {
        self.apply_reports();
        let commit = self.machine.confirm_integration(self.clock.now_ms())?;
        debug!(?commit, "integration confirmed");
        Ok(commit)
    }

    pub fn confirm_sense_failure(&mut self) -> Result<()> {
        self.machine.confirm_sense_failure()?;
        Ok(())
    }

    /// Ask to leave calibration. Settles at once when every sense is done.
    pub async fn request_exit(&mut self) -> Result<ExitOutcome> {
        match self.machine.request_exit()? {
            ExitRequest::ConfirmationShown => Ok(ExitOutcome::ConfirmationShown),
            ExitRequest::Ignored => Ok(ExitOutcome::Ignored),
            ExitRequest::Settle => self.settle().await,
        }
    }

    pub async fn confirm_exit(&mut self) -> Result<ExitOutcome> {
        match self.machine.confirm_exit()? {
            ExitRequest::ConfirmationShown => Ok(ExitOutcome::ConfirmationShown),
            ExitRequest::Ignored => Ok(ExitOutcome::Ignored),
            ExitRequest::Settle => self.settle().await,
        }
    }

    pub fn cancel_exit(&mut self) -> Result<()> {
        self.machine.cancel_exit()?;
        Ok(())
    }

    async fn settle(&mut self) -> Result<ExitOutcome> {
        self.apply_reports();
        let Some(guard) = self.lock.try_acquire(ActionKind::Exit) else {
            self.machine.abandon_exit()?;
            return Ok(ExitOutcome::Busy);
        };
        self.last_error = None;
        let mut pending = PendingExit {
            machine: &mut self.machine,
            settled: false,
        };
        let result = self.contract.attempt_exit(self.config.player.clone()).await;
        drop(guard);

        let settlement = match result {
            Ok((success, total_score)) => {
                let local = pending.machine.playthrough().total_score();
                if total_score != local {
                    warn!(total_score, local, "on-chain total differs from local total");
                }
                info!(success, total_score, "attempt_exit");
                Settlement::contract(success, total_score)
            }
            Err(err) => {
                error!(?err, "attempt_exit failed, using local verdict");
                self.last_error = Some(err.to_string());
                Settlement::fallback(pending.machine.playthrough())
            }
        };
        let verdict = pending.machine.settle(settlement)?;
        pending.settled = true;
        drop(pending);
        info!(?verdict, fallback = settlement.is_fallback(), "settled");

        let notify = settlement.notifications();
        if notify.awaken {
            if let Some(character) = self.machine.character() {
                self.observer.awaken(character.index());
            }
        }
        if notify.game_complete {
            self.observer.game_complete();
        }
        if notify.standings_refresh {
            self.observer.standings_refresh();
        }
        Ok(ExitOutcome::Settled {
            verdict,
            settlement,
        })
    }

    pub fn continue_to_leaderboard(&mut self) -> Result<()> {
        self.machine.continue_to_leaderboard()?;
        Ok(())
    }

    /// Start over. Reports from the previous playthrough are ignored.
    pub fn restart(&mut self) -> Result<u32> {
        let session_id = self.machine.restart(&mut self.rng)?;
        self.epoch += 1;
        self.run_started_ms = None;
        self.last_error = None;
        info!(session_id, "restarted");
        Ok(session_id)
    }

    /// Compare local state with the contract's session record.
    pub async fn reconcile(&self) -> Result<Reconciliation> {
        let session = self
            .contract
            .get_session(self.config.player.clone())
            .await
            .map_err(Error::contract)?;
        let reconciliation = Reconciliation::compare(&self.machine, session);
        for divergence in &reconciliation.divergences {
            warn!(?divergence, "local state differs from chain");
        }
        Ok(reconciliation)
    }

    /// Ranked leaderboard, optionally for one character.
    pub async fn leaderboard(&self, character: Option<Character>) -> Result<Vec<Ranked>> {
        let entries = self
            .contract
            .get_leaderboard()
            .await
            .map_err(Error::contract)?;
        Ok(rank(&entries, character))
    }
}

#[allow(clippy::too_many_arguments)]
async fn open_session<C: Contract>(
    contract: C,
    lock: ActionLock,
    sender: ReportSender,
    epoch: Epoch,
    start: SessionStart,
    player: Address,
    house: Address,
    stake_points: i128,
) {
    let Some(guard) = lock.try_acquire(ActionKind::StartSession) else {
        let _ = sender.unbounded_send(Report::SessionDropped { epoch });
        return;
    };
    let result: std::result::Result<u32, C::Error> = async {
        contract
            .start_session(start.session_id, player.clone(), house, stake_points, stake_points)
            .await?;
        info!(session_id = start.session_id, "start_session");
        contract
            .set_character(player, start.character.index())
            .await
    }
    .await;
    drop(guard);

    let report = match result {
        Ok(session_id) => {
            info!(character = %start.character, session_id, "set_character");
            Report::SessionOpened { epoch, session_id }
        }
        Err(err) => {
            warn!(?err, "session start failed");
            Report::SessionFailed {
                epoch,
                error: err.to_string(),
            }
        }
    };
    let _ = sender.unbounded_send(report);
}

#[allow(clippy::too_many_arguments)]
async fn prove_and_submit<C: Contract, P: Prover>(
    contract: C,
    prover: P,
    lock: ActionLock,
    sender: ReportSender,
    epoch: Epoch,
    player: Address,
    sense: Sense,
    request: ProofRequest,
) {
    let proof = match prover.generate_proof(request).await {
        Ok(proof) => proof,
        Err(err) => {
            warn!(%sense, ?err, "proof generation failed");
            let _ = sender.unbounded_send(Report::ProofFailed {
                epoch,
                sense,
                error: err.to_string(),
            });
            return;
        }
    };
    let bytes = proof.proof.clone();
    debug!(
        %sense,
        prefix = %hex::encode(&bytes[..bytes.len().min(8)]),
        len = bytes.len(),
        "proof ready"
    );
    let _ = sender.unbounded_send(Report::ProofReady {
        epoch,
        sense,
        proof,
    });

    let Some(guard) = lock.try_acquire(ActionKind::Submit(sense)) else {
        let _ = sender.unbounded_send(Report::SubmissionDropped { epoch, sense });
        return;
    };
    let result = contract
        .submit_sense_completion(Submission {
            player,
            sense,
            maze_id: request.maze_id,
            points: request.points,
            time_ms: request.time_ms,
            score: request.score,
            proof: bytes,
        })
        .await;
    drop(guard);

    let report = match result {
        Ok(()) => {
            info!(%sense, score = request.score, "submit_sense_completion");
            Report::Submitted { epoch, sense }
        }
        Err(err) => {
            warn!(%sense, ?err, "submit_sense_completion failed");
            Report::SubmissionFailed {
                epoch,
                sense,
                error: err.to_string(),
            }
        }
    };
    let _ = sender.unbounded_send(report);
}
