use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::api::GameApi;
use crate::core::command::{Command, Effect, Outgoing, Reply, Request, Response};
use crate::core::controller::Controller;
use crate::core::timers::Timers;
use crate::error::DriverError;

/// Runs the controller against a [`GameApi`]: performs requested I/O on tokio
/// tasks, owns the loop timers and feeds results back in arrival order.
pub struct Driver<A: GameApi> {
    api: Arc<A>,
    controller: Controller,
    timers: Timers,
    tx: mpsc::UnboundedSender<Response>,
    rx: mpsc::UnboundedReceiver<Response>,
    in_flight: usize,
}

impl<A: GameApi> Driver<A> {
    pub fn new(api: Arc<A>, controller: Controller) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            api,
            controller,
            timers: Timers::default(),
            tx,
            rx,
            in_flight: 0,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn dispatch(&mut self, command: Command) {
        let effects = self.controller.handle_command(command);
        self.apply(effects);
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send(outgoing) => self.spawn_request(outgoing),
                Effect::Arm { kind, after } => self.timers.arm(kind, after),
                Effect::Disarm(kind) => self.timers.disarm(kind),
            }
        }
    }

    /// In-flight requests are never cancelled; the controller decides whether
    /// their replies still matter.
    fn spawn_request(&mut self, outgoing: Outgoing) {
        let Outgoing { origin, epoch, request } = outgoing;
        debug!(?origin, epoch, ?request, "dispatching request");
        self.in_flight += 1;
        let api = Arc::clone(&self.api);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let reply = execute(api.as_ref(), request).await;
            let _ = tx.send(Response { origin, epoch, reply });
        });
    }

    /// Waits for the next response or timer and hands it to the controller.
    pub async fn next_event(&mut self) -> Result<(), DriverError> {
        if self.in_flight == 0 && !self.timers.any_armed() {
            return Err(DriverError::Stalled);
        }
        tokio::select! {
            response = self.rx.recv() => {
                let response = response.ok_or(DriverError::ChannelClosed)?;
                self.in_flight = self.in_flight.saturating_sub(1);
                let effects = self.controller.handle_response(response);
                self.apply(effects);
            }
            kind = self.timers.fired() => {
                let effects = self.controller.handle_timer(kind);
                self.apply(effects);
            }
        }
        Ok(())
    }

    /// Like [`Driver::next_event`] but parks instead of failing when idle, so it
    /// can sit in a `select!` next to terminal input.
    pub async fn pump(&mut self) {
        if self.next_event().await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    pub async fn run_until<F>(&mut self, mut done: F) -> Result<(), DriverError>
    where
        F: FnMut(&Controller) -> bool,
    {
        while !done(&self.controller) {
            self.next_event().await?;
        }
        Ok(())
    }
}

pub async fn execute<A: GameApi + ?Sized>(api: &A, request: Request) -> Reply {
    match request {
        Request::NewGame(req) => Reply::NewGame(api.new_game(req).await),
        Request::MakeMove(req) => Reply::Move(api.make_move(req).await),
        Request::AiMove(query) => Reply::AiMove(api.ai_move(query).await),
        Request::StartTraining(req) => Reply::TrainingStarted(api.start_training(req).await),
        Request::TrainingStatus => Reply::TrainingStatus(api.training_status().await),
        Request::StopTraining => Reply::TrainingStopped(api.stop_training().await),
        Request::SaveModel => Reply::ModelSaved(api.save_model().await),
    }
}
