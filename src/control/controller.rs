//! The control loop
//!
//! Owns the switcher model, the engine connection and the publisher. Takes
//! one request at a time off the control channel and runs it to completion,
//! cut waits included, before acknowledging and taking the next.

use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use super::publisher::Publisher;
use super::{ControlRequest, Shutdown};
use crate::config::AppConfig;
use crate::downstream::DownstreamClient;
use crate::error::{DownstreamError, Error};
use crate::protocol::{Ack, Notification, Request};
use crate::switcher::{Effects, Switcher};

/// Whether the loop keeps going after a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Sequential request processor
pub struct Controller<S = TcpStream> {
    switcher: Switcher,
    downstream: DownstreamClient<S>,
    publisher: Publisher,
    cut_duration: f64,
    shutdown: Shutdown,
    requests_handled: u64,
}

impl<S> Controller<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        config: &AppConfig,
        downstream: DownstreamClient<S>,
        publisher: Publisher,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            switcher: Switcher::new(&config.switcher),
            downstream,
            publisher,
            cut_duration: config.switcher.cut_duration,
            shutdown,
            requests_handled: 0,
        }
    }

    pub fn switcher(&self) -> &Switcher {
        &self.switcher
    }

    pub fn requests_handled(&self) -> u64 {
        self.requests_handled
    }

    /// Put the engine into a known state: keyers hidden, buses applied
    pub async fn startup(&mut self) -> Result<(), DownstreamError> {
        let effects = self.switcher.startup();
        self.apply(effects).await
    }

    /// Serve requests until `quit`, shutdown, or every handle is dropped
    pub async fn run(mut self, mut requests: mpsc::Receiver<ControlRequest>) {
        if let Err(e) = self.startup().await {
            tracing::error!("Failed to initialise engine state: {}", e);
        }

        loop {
            let next = tokio::select! {
                request = requests.recv() => request,
                _ = self.shutdown.wait() => None,
            };

            let Some(ControlRequest { request, reply }) = next else {
                break;
            };

            tracing::info!("Request: {} {:?}", request.action(), request);
            let (ack, flow) = self.handle(request).await;
            if !ack.is_ok() {
                tracing::warn!("Request failed: {}", ack.error.as_deref().unwrap_or(""));
            }

            if reply.send(ack).is_err() {
                tracing::debug!("Requester went away before the acknowledgement");
            }

            if flow == Flow::Quit {
                break;
            }
        }

        self.teardown().await;
    }

    async fn handle(&mut self, request: Request) -> (Ack, Flow) {
        self.requests_handled += 1;

        let result = match request {
            Request::Noop => Ok(Ack::ok()),
            Request::Transition { duration } => {
                let duration = duration.unwrap_or(self.cut_duration);
                match self.cut_transition(duration).await {
                    Ok(true) => Ok(Ack::ok()),
                    Ok(false) => return (Ack::error("transition cancelled by shutdown"), Flow::Quit),
                    Err(e) => Err(e),
                }
            }
            Request::Take => {
                let effects = self.switcher.take();
                self.perform(effects).await
            }
            Request::Sync => {
                let effects = self.switcher.sync();
                self.perform(effects).await
            }
            Request::SetProgram { feed } => {
                let effects = self.switcher.set_program(feed);
                self.perform(effects).await
            }
            Request::SetPreview { feed } => {
                let effects = self.switcher.set_preview(feed);
                self.perform(effects).await
            }
            Request::ToggleDsk { dsk_id } => match self.switcher.toggle_dsk(dsk_id) {
                Ok(effects) => self.perform(effects).await,
                Err(e) => Err(e.into()),
            },
            Request::ListFeeds => self
                .downstream
                .list_feed_ids()
                .await
                .map(Ack::with_feeds)
                .map_err(Error::from),
            Request::Quit => {
                self.publisher.publish(&Notification::Quit);
                return (Ack::ok(), Flow::Quit);
            }
        };

        match result {
            Ok(ack) => (ack, Flow::Continue),
            Err(e) => (Ack::error(e.to_string()), Flow::Continue),
        }
    }

    async fn perform(&mut self, effects: Effects) -> Result<Ack, Error> {
        self.apply(effects).await?;
        Ok(Ack::ok())
    }

    /// Send commands in order, then publish notifications.
    ///
    /// Notifications go out even when a command failed: the model has
    /// already changed and observers should see it.
    async fn apply(&mut self, effects: Effects) -> Result<(), DownstreamError> {
        let mut sent = Ok(());
        for command in &effects.commands {
            if let Err(e) = self.downstream.send_command(command, false).await {
                sent = Err(e);
                break;
            }
        }

        for notification in &effects.notifications {
            self.publisher.publish(notification);
        }

        sent
    }

    /// Ramp the preview feed, wait for the ramp, then take.
    ///
    /// Returns `Ok(false)` when shutdown interrupted the wait; the take is
    /// skipped in that case.
    async fn cut_transition(&mut self, duration: f64) -> Result<bool, Error> {
        let plan = self.switcher.plan_cut(duration)?;
        if let Some(ramp) = &plan.ramp {
            self.downstream.send_command(ramp, false).await?;
        }

        if !wait_for_ramp(&self.shutdown, plan.wait).await {
            tracing::warn!("Cut transition interrupted after ramp start");
            return Ok(false);
        }

        let effects = self.switcher.take();
        self.apply(effects).await?;
        Ok(true)
    }

    async fn teardown(&mut self) {
        self.downstream.shutdown().await;
        self.shutdown.trigger();
        tracing::info!(
            "Control loop stopped after {} requests | {} engine commands | {} observers attached",
            self.requests_handled,
            self.downstream.commands_sent(),
            self.publisher.subscriber_count()
        );
    }
}

/// Sleep for `wait` unless shutdown comes first; `false` when interrupted
async fn wait_for_ramp(shutdown: &Shutdown, wait: Duration) -> bool {
    if wait.is_zero() {
        return true;
    }

    tokio::select! {
        _ = tokio::time::sleep(wait) => true,
        _ = shutdown.wait() => false,
    }
}
