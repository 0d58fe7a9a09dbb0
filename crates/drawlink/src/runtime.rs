use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use brush_execution::ClassicBrush;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError, bounded};
use document::LayerInfo;
use driver::{
    PointerEventReceiver, PointerEventSender, PointerPhase, PointerQueueCreateError,
    create_pointer_queue,
};
use engine::Origin;
use model::{Color, LayerId, Rectangle, Size};
use renderer::{PixelBuffer, ViewId};

use crate::config::{ConfigError, EngineConfig};
use crate::observer::{CanvasObserver, Notification};
use crate::paint_engine::{EngineError, PaintEngine};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeStartError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    PointerQueue(#[from] PointerQueueCreateError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandleError {
    #[error("paint engine thread is gone")]
    Disconnected,
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Canvas facts answered by [`EngineHandle::canvas_info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanvasInfo {
    pub size: Size,
    pub background: Color,
    pub layers: Vec<LayerInfo>,
    pub history_len: usize,
    pub pending_local: usize,
}

enum EngineCommand {
    Receive(Vec<u8>),
    RegisterView(Sender<ViewId>),
    UnregisterView(ViewId),
    GetRegion {
        view: ViewId,
        rect: Rectangle,
        reply: Sender<Option<PixelBuffer>>,
    },
    CanvasInfo(Sender<CanvasInfo>),
    TakeOutbound(Sender<Vec<u8>>),
    SetBrush(ClassicBrush, Sender<Result<(), EngineError>>),
    SetLayer(LayerId),
    Cleanup,
    Reset,
}

/// Clonable access to the engine thread for network and presentation code.
#[derive(Clone)]
pub struct EngineHandle {
    commands: Sender<EngineCommand>,
}

impl EngineHandle {
    /// Queue a buffer received from the server.
    pub fn receive(&self, bytes: Vec<u8>) -> Result<(), HandleError> {
        self.send(EngineCommand::Receive(bytes))
    }

    pub fn register_view(&self) -> Result<ViewId, HandleError> {
        self.request(EngineCommand::RegisterView)
    }

    pub fn unregister_view(&self, view: ViewId) -> Result<(), HandleError> {
        self.send(EngineCommand::UnregisterView(view))
    }

    pub fn get_region(
        &self,
        view: ViewId,
        rect: Rectangle,
    ) -> Result<Option<PixelBuffer>, HandleError> {
        self.request(|reply| EngineCommand::GetRegion { view, rect, reply })
    }

    pub fn canvas_info(&self) -> Result<CanvasInfo, HandleError> {
        self.request(EngineCommand::CanvasInfo)
    }

    /// Encoded local messages for the server, oldest first.
    pub fn take_outbound(&self) -> Result<Vec<u8>, HandleError> {
        self.request(EngineCommand::TakeOutbound)
    }

    pub fn set_brush(&self, brush: ClassicBrush) -> Result<(), HandleError> {
        Ok(self.request(|reply| EngineCommand::SetBrush(brush, reply))??)
    }

    /// Layer that pointer strokes draw on from the next stroke on.
    pub fn set_layer(&self, layer: LayerId) -> Result<(), HandleError> {
        self.send(EngineCommand::SetLayer(layer))
    }

    pub fn cleanup(&self) -> Result<(), HandleError> {
        self.send(EngineCommand::Cleanup)
    }

    pub fn reset(&self) -> Result<(), HandleError> {
        self.send(EngineCommand::Reset)
    }

    fn send(&self, command: EngineCommand) -> Result<(), HandleError> {
        self.commands
            .send(command)
            .map_err(|_| HandleError::Disconnected)
    }

    fn request<T>(&self, command: impl FnOnce(Sender<T>) -> EngineCommand) -> Result<T, HandleError> {
        let (reply, response) = bounded(1);
        self.send(command(reply))?;
        response.recv().map_err(|_| HandleError::Disconnected)
    }
}

/// Owns the paint engine thread. All canvas mutation happens there, one
/// command or pointer event at a time. Dropping the runtime stops the thread.
pub struct EngineRuntime {
    stop_requested: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl EngineRuntime {
    pub fn start(
        config: EngineConfig,
    ) -> Result<(Self, EngineHandle, PointerEventSender, Receiver<Notification>), RuntimeStartError>
    {
        let engine = PaintEngine::new(&config)?;
        let (pointer_sender, pointer_receiver) = create_pointer_queue(config.pointer_queue_capacity)?;
        let (command_sender, command_receiver) = bounded(config.command_queue_capacity);
        let (notification_sender, notification_receiver) =
            bounded(config.notification_queue_capacity);
        let stop_requested = Arc::new(AtomicBool::new(false));
        let worker_stop_requested = Arc::clone(&stop_requested);

        let join_handle = std::thread::Builder::new()
            .name("paint_engine".to_owned())
            .spawn(move || {
                paint_engine_loop(
                    engine,
                    worker_stop_requested,
                    command_receiver,
                    pointer_receiver,
                    ChannelObserver::new(notification_sender),
                )
            })
            .expect("spawn paint engine thread");
        tracing::info!(
            width = config.canvas_width,
            height = config.canvas_height,
            user = config.local_user_id,
            "paint engine started"
        );

        Ok((
            Self {
                stop_requested,
                join_handle: Some(join_handle),
            },
            EngineHandle {
                commands: command_sender,
            },
            pointer_sender,
            notification_receiver,
        ))
    }
}

impl Drop for EngineRuntime {
    fn drop(&mut self) {
        self.stop_requested.store(true, Ordering::Release);
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.join().expect("join paint engine thread");
        }
        tracing::debug!("paint engine stopped");
    }
}

/// Forwards notifications into a bounded channel. What does not fit waits
/// here, with consecutive repaint areas merged, until the consumer catches up.
struct ChannelObserver {
    sender: Sender<Notification>,
    backlog: VecDeque<Notification>,
    disconnected: bool,
}

impl ChannelObserver {
    fn new(sender: Sender<Notification>) -> Self {
        Self {
            sender,
            backlog: VecDeque::new(),
            disconnected: false,
        }
    }

    fn post(&mut self, notification: Notification) {
        if self.disconnected {
            return;
        }
        if let (Some(Notification::AreaChanged(pending)), Notification::AreaChanged(area)) =
            (self.backlog.back_mut(), &notification)
        {
            *pending = pending.united(area);
        } else {
            let replaces_tail = matches!(
                (self.backlog.back(), &notification),
                (Some(Notification::LayersChanged(_)), Notification::LayersChanged(_))
                    | (Some(Notification::OutboundReady), Notification::OutboundReady)
            );
            if replaces_tail {
                self.backlog.pop_back();
            }
            self.backlog.push_back(notification);
        }
        self.flush();
    }

    fn flush(&mut self) {
        while let Some(notification) = self.backlog.pop_front() {
            match self.sender.try_send(notification) {
                Ok(()) => {}
                Err(TrySendError::Full(notification)) => {
                    self.backlog.push_front(notification);
                    return;
                }
                Err(TrySendError::Disconnected(_)) => {
                    tracing::debug!("notification receiver dropped");
                    self.backlog.clear();
                    self.disconnected = true;
                    return;
                }
            }
        }
    }
}

impl CanvasObserver for ChannelObserver {
    fn on_area_changed(&mut self, area: Rectangle) {
        self.post(Notification::AreaChanged(area));
    }

    fn on_resized(&mut self, x_offset: i32, y_offset: i32, old_size: Size) {
        self.post(Notification::Resized {
            x_offset,
            y_offset,
            old_size,
        });
    }

    fn on_layers_changed(&mut self, layers: &[LayerInfo]) {
        self.post(Notification::LayersChanged(layers.to_vec()));
    }
}

struct EngineThread {
    engine: PaintEngine,
    observer: ChannelObserver,
    active_layer: Option<LayerId>,
    outbound_announced: bool,
    reported_fatal: bool,
}

fn paint_engine_loop(
    engine: PaintEngine,
    stop_requested: Arc<AtomicBool>,
    commands: Receiver<EngineCommand>,
    mut pointer_events: PointerEventReceiver,
    observer: ChannelObserver,
) {
    const IDLE_WAIT_DURATION: Duration = Duration::from_millis(1);

    let mut thread = EngineThread {
        engine,
        observer,
        active_layer: None,
        outbound_announced: false,
        reported_fatal: false,
    };
    let mut handles_dropped = false;
    while !stop_requested.load(Ordering::Acquire) {
        while let Some(event) = pointer_events.pop() {
            thread.handle_pointer(event.phase, event.sample);
        }
        thread.after_batch();

        if handles_dropped {
            std::thread::sleep(IDLE_WAIT_DURATION);
            continue;
        }
        match commands.recv_timeout(IDLE_WAIT_DURATION) {
            Ok(command) => {
                thread.handle_command(command);
                while let Ok(command) = commands.try_recv() {
                    thread.handle_command(command);
                }
                thread.after_batch();
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::debug!("all engine handles dropped");
                handles_dropped = true;
            }
        }
    }
}

impl EngineThread {
    fn handle_pointer(&mut self, phase: PointerPhase, sample: driver::PointerSample) {
        let result = match phase {
            PointerPhase::Down => match self.active_layer {
                Some(layer) => self.engine.begin_stroke(layer, sample, &mut self.observer),
                None => {
                    tracing::warn!("pointer down without an active layer");
                    Ok(())
                }
            },
            PointerPhase::Move => {
                if self.engine.is_stroking() {
                    self.engine.stroke_to(sample, &mut self.observer)
                } else {
                    Ok(())
                }
            }
            PointerPhase::Up => self.engine.end_stroke(&mut self.observer),
            PointerPhase::Cancel => self.engine.cancel_stroke(&mut self.observer),
        };
        self.report(result);
    }

    fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Receive(bytes) => {
                let result = self
                    .engine
                    .receive_messages(Origin::Remote, &bytes, &mut self.observer)
                    .map(|_| ());
                self.report(result);
            }
            EngineCommand::RegisterView(reply) => {
                let _ = reply.send(self.engine.register_view());
            }
            EngineCommand::UnregisterView(view) => {
                self.engine.unregister_view(view);
            }
            EngineCommand::GetRegion { view, rect, reply } => {
                let _ = reply.send(self.engine.get_region(view, rect));
            }
            EngineCommand::CanvasInfo(reply) => {
                let _ = reply.send(CanvasInfo {
                    size: self.engine.canvas_size(),
                    background: self.engine.background_color(),
                    layers: self.engine.layers(),
                    history_len: self.engine.history_len(),
                    pending_local: self.engine.pending_local(),
                });
            }
            EngineCommand::TakeOutbound(reply) => {
                self.outbound_announced = false;
                let _ = reply.send(self.engine.take_outbound());
            }
            EngineCommand::SetBrush(brush, reply) => {
                let _ = reply.send(self.engine.set_brush(brush));
            }
            EngineCommand::SetLayer(layer) => self.active_layer = Some(layer),
            EngineCommand::Cleanup => {
                self.engine.cleanup();
                self.outbound_announced = false;
            }
            EngineCommand::Reset => {
                self.engine.reset(&mut self.observer);
                self.outbound_announced = false;
                self.reported_fatal = false;
            }
        }
    }

    fn report(&mut self, result: Result<(), EngineError>) {
        match result {
            Ok(()) => {}
            Err(EngineError::Fatal(error)) => {
                if !self.reported_fatal {
                    self.reported_fatal = true;
                    self.observer.post(Notification::Fatal(error));
                }
            }
            Err(error) => tracing::warn!(%error, "engine call failed"),
        }
    }

    fn after_batch(&mut self) {
        if self.engine.has_outbound() && !self.outbound_announced {
            self.outbound_announced = true;
            self.observer.post(Notification::OutboundReady);
        }
        self.observer.flush();
    }
}
