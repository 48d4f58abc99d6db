mod state_machine;

use anyhow::{anyhow, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use sabirth_client::{
    mocks::{ManualClock, Method, MockContract, MockProver},
    Config as SessionConfig, ExitOutcome, NoopObserver, Orchestrator, ValidatedConfig,
};
use sabirth_execution::{leaderboard::rank_of, MazeCompletion, Settlement, Verdict};
use sabirth_types::{Character, Sense};
use serde::{Deserialize, Serialize};
use state_machine::Engine as BotEngine;
pub use state_machine::{Status, Strategy};
use tracing::{debug, info, warn};

/// Configuration for randotron (from config file).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub session: SessionConfig,
    #[serde(default = "default_playthroughs")]
    pub playthroughs: usize,
    #[serde(default)]
    pub strategy: Strategy,
    /// Random steps before a wandering bot heads straight for its target.
    #[serde(default = "default_wander_steps")]
    pub wander_steps: usize,
    /// Simulated time per maze step.
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,
    /// Chance of leaving after each calibrated sense.
    #[serde(default)]
    pub exit_early_rate: f64,
    /// Failed senses tolerated before the bot leaves.
    #[serde(default = "default_max_failures")]
    pub max_failures: usize,
    #[serde(default)]
    pub prover_failure_rate: f64,
    #[serde(default)]
    pub submission_failure_rate: f64,
    #[serde(default)]
    pub exit_failure_rate: f64,
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
}

fn default_playthroughs() -> usize {
    10
}

fn default_wander_steps() -> usize {
    200
}

fn default_step_ms() -> u64 {
    150
}

fn default_max_failures() -> usize {
    3
}

fn default_worker_threads() -> usize {
    2
}

impl Config {
    pub fn from_yaml(contents: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    fn check_rates(&self) -> Result<()> {
        for (name, rate) in [
            ("exit_early_rate", self.exit_early_rate),
            ("prover_failure_rate", self.prover_failure_rate),
            ("submission_failure_rate", self.submission_failure_rate),
            ("exit_failure_rate", self.exit_failure_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(anyhow!("{name} must be within [0, 1] (got {rate})"));
            }
        }
        Ok(())
    }
}

/// Outcome of one playthrough, printed as a JSON line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub playthrough: usize,
    pub session_id: u32,
    pub character: Character,
    pub completed: Vec<Sense>,
    pub failed_senses: usize,
    pub total_score: u64,
    pub verdict: Verdict,
    pub fallback: bool,
    pub rank: Option<usize>,
    pub last_error: Option<String>,
}

type Bot = Orchestrator<MockContract, MockProver, ManualClock, NoopObserver>;

/// Plays full sessions against an in-process calibration ledger.
pub struct Engine {
    config: Config,
    contract: MockContract,
    clock: ManualClock,
    orchestrator: Bot,
    bot: BotEngine<ChaCha20Rng>,
}

impl Engine {
    pub fn new(config: Config) -> Result<Self> {
        config.check_rates()?;
        let session: ValidatedConfig = config.session.clone().validate()?;
        let seed = session.seed.unwrap_or_else(rand::random);

        let contract = MockContract::new();
        contract.fail_randomly(
            Method::SubmitSenseCompletion,
            config.submission_failure_rate,
            seed,
        );
        contract.fail_randomly(Method::AttemptExit, config.exit_failure_rate, seed);
        let prover = MockProver::new();
        prover.fail_randomly(config.prover_failure_rate, seed);
        let clock = ManualClock::new(0);

        let orchestrator = Orchestrator::new(
            session,
            contract.clone(),
            prover,
            clock.clone(),
            NoopObserver,
        );
        let bot = BotEngine::new(
            ChaCha20Rng::seed_from_u64(seed),
            config.strategy,
            config.wander_steps,
            config.exit_early_rate,
            config.max_failures,
        );
        Ok(Self {
            config,
            contract,
            clock,
            orchestrator,
            bot,
        })
    }

    pub fn contract(&self) -> &MockContract {
        &self.contract
    }

    /// Walk one maze and report the run.
    async fn calibrate(&mut self, sense: Sense) -> Result<()> {
        let mut run = self.orchestrator.enter_maze(sense)?;
        let mut steps = 0;
        while let Some(direction) = self.bot.next_move(&run, steps) {
            run.step(direction);
            self.clock.advance(self.config.step_ms);
            steps += 1;
        }
        if !run.at_goal() {
            warn!(%sense, steps, "no path to goal, leaving maze");
            self.bot.record_failure();
            self.orchestrator.abort_maze()?;
            return Ok(());
        }
        match self.orchestrator.finish_run(&run)? {
            MazeCompletion::Accepted { score, .. } => {
                debug!(%sense, steps, score, "calibrated");
                self.orchestrator.wait_for_display().await;
                self.orchestrator.confirm_integration()?;
            }
            MazeCompletion::Failed { score, .. } => {
                debug!(%sense, steps, score, "sense failed");
                self.bot.record_failure();
                self.orchestrator.confirm_sense_failure()?;
            }
            MazeCompletion::Duplicate => warn!(%sense, "duplicate completion"),
        }
        Ok(())
    }

    async fn exit(&mut self, early: bool) -> Result<(Verdict, Settlement)> {
        // Let every submission land before the exit call.
        self.orchestrator.flush().await;
        let mut outcome = self.orchestrator.request_exit().await?;
        if early && outcome == ExitOutcome::ConfirmationShown {
            outcome = self.orchestrator.confirm_exit().await?;
        }
        match outcome {
            ExitOutcome::Settled {
                verdict,
                settlement,
            } => Ok((verdict, settlement)),
            outcome => Err(anyhow!("exit did not settle: {outcome:?}")),
        }
    }

    /// Play one session from the intro screen to a verdict.
    pub async fn play(&mut self, playthrough: usize) -> Result<Summary> {
        self.bot.reset();
        self.orchestrator.acknowledge_intro()?;
        let character = self.bot.pick_character();
        self.orchestrator.select_character(character)?;
        self.orchestrator.wait_for_display().await;
        self.orchestrator.confirm_lore()?;

        let (verdict, settlement) = loop {
            self.orchestrator.apply_reports();
            match self.bot.next(self.orchestrator.machine().playthrough()) {
                Status::Calibrate(sense) => self.calibrate(sense).await?,
                Status::ExitEarly => break self.exit(true).await?,
                Status::Exit => break self.exit(false).await?,
            }
        };

        let machine = self.orchestrator.machine();
        let playthrough_state = machine.playthrough();
        let total_score = playthrough_state.total_score();
        let mut summary = Summary {
            playthrough,
            session_id: machine.session_id(),
            character,
            completed: playthrough_state.completed().collect(),
            failed_senses: self.bot.failures(),
            total_score,
            verdict,
            fallback: settlement.is_fallback(),
            rank: None,
            last_error: self.orchestrator.last_error().map(str::to_string),
        };
        if verdict == Verdict::Success {
            self.orchestrator.continue_to_leaderboard()?;
            let entries = self.contract.ledger().get_leaderboard();
            summary.rank = rank_of(&entries, self.orchestrator.player(), total_score);
        }
        let reconciliation = self.orchestrator.reconcile().await?;
        if !reconciliation.is_consistent() {
            warn!(
                playthrough,
                divergences = reconciliation.divergences.len(),
                "session differs from chain"
            );
        }
        info!(
            playthrough,
            %character,
            ?verdict,
            total_score,
            completed = summary.completed.len(),
            "playthrough settled"
        );

        self.orchestrator.flush().await;
        self.orchestrator.restart()?;
        Ok(summary)
    }

    /// Play every configured playthrough.
    pub async fn run(mut self) -> Result<Vec<Summary>> {
        let mut summaries = Vec::with_capacity(self.config.playthroughs);
        for playthrough in 0..self.config.playthroughs {
            summaries.push(self.play(playthrough).await?);
        }
        Ok(summaries)
    }
}
