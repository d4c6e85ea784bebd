use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU8, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use super::{
    PlaybackConfig, PlaybackItem, PlaybackStatus, PlaybackTarget,
    countdown::{Countdown, TickOutcome},
    device::{DeviceResult, PlaybackDevice},
    fade::FadeRamp,
};

const TICK: Duration = Duration::from_secs(1);

/// Receives the controller's observable transitions.
pub trait PlaybackListener: Send + Sync {
    /// The loop moved to `index`, after a tick or a skip.
    fn item_changed(&self, index: usize) -> BoxFuture<'static, ()>;
    /// The countdown status changed.
    fn status_changed(&self, status: PlaybackStatus) -> BoxFuture<'static, ()>;
}

enum ControlCommand {
    SkipTo(usize),
    Stop(oneshot::Sender<()>),
}

/// Handle on a running auto-play loop.
///
/// The loop owns the countdown and the single in-flight device effect
/// (item start or fade ramp). Dropping the handle shuts the loop down in
/// the background; [`PlaybackController::stop`] waits for it.
pub struct PlaybackController {
    commands: mpsc::UnboundedSender<ControlCommand>,
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl PlaybackController {
    /// Start auto-play of `items` from `start_index` on `target`.
    pub fn spawn(
        device: Arc<dyn PlaybackDevice>,
        target: PlaybackTarget,
        items: Vec<PlaybackItem>,
        start_index: usize,
        config: PlaybackConfig,
        listener: Arc<dyn PlaybackListener>,
    ) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let mut countdown = Countdown::new(
            config.interval_secs,
            config.fade_out_lead_secs,
            items.len(),
            start_index,
        );
        countdown.start();
        let volume = Arc::new(AtomicU8::new(target.original_volume));
        let running = Arc::new(AtomicBool::new(countdown.is_running()));

        let driver = Driver {
            device,
            target,
            items,
            config: Arc::new(config),
            listener,
            countdown,
            volume,
            running: Arc::clone(&running),
            effect: None,
        };
        let task = tokio::spawn(driver.run(receiver));

        Self {
            commands,
            running,
            task,
        }
    }

    /// Whether the countdown still runs. False once the last item timed out.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Jump to `index`, restarting the interval and fading the new item in.
    ///
    /// Returns `false` when the loop is no longer running.
    pub fn skip_to(&self, index: usize) -> bool {
        self.commands.send(ControlCommand::SkipTo(index)).is_ok()
    }

    /// Cancel the countdown and any ramp, then restore the original volume.
    pub async fn stop(self) {
        let (done, stopped) = oneshot::channel();
        if self.commands.send(ControlCommand::Stop(done)).is_ok() {
            let _ = stopped.await;
        }
        if let Err(err) = self.task.await {
            warn!(error = %err, "playback loop ended abnormally");
        }
    }
}

struct Driver {
    device: Arc<dyn PlaybackDevice>,
    target: PlaybackTarget,
    items: Vec<PlaybackItem>,
    config: Arc<PlaybackConfig>,
    listener: Arc<dyn PlaybackListener>,
    countdown: Countdown,
    volume: Arc<AtomicU8>,
    running: Arc<AtomicBool>,
    effect: Option<JoinHandle<()>>,
}

impl Driver {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<ControlCommand>) {
        info!(
            device_id = %self.target.device_id,
            index = self.countdown.index(),
            "auto-play started"
        );
        self.begin_item().await;
        self.publish().await;

        let mut ticker = time::interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(ControlCommand::SkipTo(index)) => {
                        if !self.countdown.skip_to(index) {
                            debug!(index, "ignoring skip outside the queue");
                            continue;
                        }
                        ticker.reset();
                        // Overrides an auto-advance reported while the skip was queued.
                        self.listener.item_changed(index).await;
                        self.begin_item().await;
                        self.publish().await;
                    }
                    Some(ControlCommand::Stop(done)) => {
                        self.shutdown().await;
                        let _ = done.send(());
                        return;
                    }
                    None => {
                        self.shutdown().await;
                        return;
                    }
                },
                _ = ticker.tick(), if self.countdown.is_running() => {
                    match self.countdown.tick() {
                        TickOutcome::FadeOut => self.fade_out().await,
                        TickOutcome::Advanced(index) => {
                            self.listener.item_changed(index).await;
                            self.begin_item().await;
                        }
                        TickOutcome::Finished => {
                            info!(index = self.countdown.index(), "auto-play reached the last item");
                        }
                        TickOutcome::Counting | TickOutcome::Idle => {}
                    }
                    self.publish().await;
                }
            }
        }
    }

    async fn begin_item(&mut self) {
        let Some(item) = self.items.get(self.countdown.index()).cloned() else {
            return;
        };
        let effect = start_item(
            Arc::clone(&self.device),
            self.target.clone(),
            item,
            Arc::clone(&self.config),
            Arc::clone(&self.volume),
        );
        self.replace_effect(effect).await;
    }

    async fn fade_out(&mut self) {
        let ramp = FadeRamp::new(
            self.volume.load(Ordering::SeqCst),
            0,
            self.config.fade_out_steps,
            Duration::from_millis(self.config.fade_out_ms),
        );
        let effect = run_ramp(
            Arc::clone(&self.device),
            self.target.device_id.clone(),
            ramp,
            Arc::clone(&self.volume),
        );
        self.replace_effect(effect).await;
    }

    async fn replace_effect(&mut self, effect: impl Future<Output = ()> + Send + 'static) {
        self.cancel_effect().await;
        self.effect = Some(tokio::spawn(effect));
    }

    async fn cancel_effect(&mut self) {
        if let Some(effect) = self.effect.take() {
            effect.abort();
            let _ = effect.await;
        }
    }

    async fn shutdown(&mut self) {
        self.countdown.stop();
        self.cancel_effect().await;

        let device_id = self.target.device_id.as_str();
        best_effort(self.device.pause(device_id)).await;
        best_effort(self.device.set_volume(device_id, self.target.original_volume)).await;
        self.volume
            .store(self.target.original_volume, Ordering::SeqCst);

        self.publish().await;
        info!(device_id = %device_id, "auto-play stopped");
    }

    async fn publish(&self) {
        self.running
            .store(self.countdown.is_running(), Ordering::SeqCst);
        let status = PlaybackStatus {
            running: self.countdown.is_running(),
            remaining_secs: self.countdown.remaining(),
            index: self.countdown.index(),
        };
        self.listener.status_changed(status).await;
    }
}

async fn start_item(
    device: Arc<dyn PlaybackDevice>,
    target: PlaybackTarget,
    item: PlaybackItem,
    config: Arc<PlaybackConfig>,
    volume: Arc<AtomicU8>,
) {
    let device_id = target.device_id.as_str();
    debug!(device_id = %device_id, item_id = %item.id, "starting item");

    best_effort(device.transfer(device_id)).await;
    time::sleep(config.transfer_settle()).await;

    let position_ms = config.start_position_ms(item.duration_ms);
    best_effort(device.play_at(device_id, &item.id, position_ms)).await;

    let start_volume = config.fade_in_start_volume.min(100);
    best_effort(device.set_volume(device_id, start_volume)).await;
    volume.store(start_volume, Ordering::SeqCst);
    time::sleep(config.playback_settle()).await;

    let ramp = FadeRamp::new(
        start_volume,
        target.original_volume,
        config.fade_in_steps,
        Duration::from_millis(config.fade_in_ms),
    );
    run_ramp(device, target.device_id, ramp, volume).await;
}

async fn run_ramp(
    device: Arc<dyn PlaybackDevice>,
    device_id: String,
    ramp: FadeRamp,
    volume: Arc<AtomicU8>,
) {
    let wait = ramp.step_duration();
    for (step, level) in ramp.levels().enumerate() {
        if step > 0 {
            time::sleep(wait).await;
        }
        best_effort(device.set_volume(&device_id, level)).await;
        volume.store(level, Ordering::SeqCst);
    }
}

async fn best_effort(command: BoxFuture<'static, DeviceResult<()>>) {
    if let Err(err) = command.await {
        warn!(command = err.command, error = %err.source, "playback command failed");
    }
}
