// src/session/mod.rs
//
// Remote-desktop session state machine. Sessions exist only between
// `remote_session_start` and `remote_session_end` (or channel loss); frames
// referencing any other session id are dropped without side effects, and no
// frame ever creates a session implicitly.
pub mod capture;
pub mod input;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::models::frames::{Frame, KeyboardEventData, MouseEventData};
use capture::{encode_frame, ScreenSource};
use input::{plan_key, plan_mouse, InputInjector};

pub struct Session {
    pub started_at: DateTime<Utc>,
}

pub struct SessionManager {
    sessions: HashMap<String, Session>,
    screen: Box<dyn ScreenSource>,
    input: Box<dyn InputInjector>,
}

impl SessionManager {
    pub fn new(screen: Box<dyn ScreenSource>, input: Box<dyn InputInjector>) -> Self {
        SessionManager {
            sessions: HashMap::new(),
            screen,
            input,
        }
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Drop every session. Called when the channel is lost: the server's
    /// side of each conversation is gone with it.
    pub fn clear(&mut self) {
        if !self.sessions.is_empty() {
            info!("dropping {} active remote session(s)", self.sessions.len());
            self.sessions.clear();
        }
    }

    /// Process one inbound frame, returning the reply to send if any.
    ///
    /// Per-event failures (capture, injection) are logged and absorbed; a
    /// bad event never ends the session or the channel.
    pub fn handle_frame(&mut self, frame: Frame) -> Option<Frame> {
        match frame {
            Frame::Ping => Some(Frame::Pong),
            Frame::RemoteSessionStart { session_id } => {
                // Idempotent: a repeated start refreshes the start time.
                info!("remote session started: {}", session_id);
                self.sessions.insert(
                    session_id,
                    Session {
                        started_at: Utc::now(),
                    },
                );
                None
            }
            Frame::RemoteSessionEnd { session_id } => {
                if self.sessions.remove(&session_id).is_some() {
                    info!("remote session ended: {}", session_id);
                } else {
                    debug!("end for unknown session {}, ignoring", session_id);
                }
                None
            }
            Frame::CaptureScreen { session_id } => self.capture_screen(&session_id),
            Frame::MouseEvent { session_id, data } => {
                self.mouse_event(&session_id, &data);
                None
            }
            Frame::KeyboardEvent { session_id, data } => {
                self.keyboard_event(&session_id, &data);
                None
            }
            // Outbound-only or unrecognized frames coming back at us.
            Frame::AgentRegister { .. }
            | Frame::ScreenData { .. }
            | Frame::Pong
            | Frame::Unknown => None,
        }
    }

    fn capture_screen(&mut self, session_id: &str) -> Option<Frame> {
        if !self.sessions.contains_key(session_id) {
            debug!("capture request for unknown session {}, ignoring", session_id);
            return None;
        }
        match self.screen.capture().and_then(encode_frame) {
            Ok(data) => Some(Frame::ScreenData {
                session_id: session_id.to_string(),
                data,
            }),
            Err(e) => {
                warn!("screen capture failed for session {}: {}", session_id, e);
                None
            }
        }
    }

    fn mouse_event(&mut self, session_id: &str, data: &MouseEventData) {
        if !self.sessions.contains_key(session_id) {
            debug!("mouse event for unknown session {}, ignoring", session_id);
            return;
        }
        let action = plan_mouse(data);
        if let Err(e) = self.input.mouse(action) {
            warn!("mouse injection failed for session {}: {}", session_id, e);
        }
    }

    fn keyboard_event(&mut self, session_id: &str, data: &KeyboardEventData) {
        if !self.sessions.contains_key(session_id) {
            debug!("keyboard event for unknown session {}, ignoring", session_id);
            return;
        }
        let Some(action) = plan_key(data) else {
            debug!("ignoring non-actionable key '{}'", data.key);
            return;
        };
        if let Err(e) = self.input.key(action) {
            warn!("keyboard injection failed for session {}: {}", session_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::capture::{CaptureError, ScreenSource};
    use super::input::{InjectError, InputInjector, KeyAction, MouseAction, NamedKey};
    use super::*;
    use crate::models::frames::{
        KeyboardEventKind, MouseEventKind,
    };
    use base64::Engine;
    use screenshots::image::{Rgba, RgbaImage};
    use std::sync::{Arc, Mutex};

    struct FakeScreen {
        width: u32,
        height: u32,
        captures: Arc<Mutex<usize>>,
    }

    impl ScreenSource for FakeScreen {
        fn capture(&mut self) -> Result<RgbaImage, CaptureError> {
            *self.captures.lock().unwrap() += 1;
            Ok(RgbaImage::from_pixel(
                self.width,
                self.height,
                Rgba([1, 2, 3, 255]),
            ))
        }
    }

    struct BrokenScreen;

    impl ScreenSource for BrokenScreen {
        fn capture(&mut self) -> Result<RgbaImage, CaptureError> {
            Err(CaptureError::Screen("display sleeping".to_string()))
        }
    }

    #[derive(Debug, PartialEq)]
    enum Injected {
        Mouse(MouseAction),
        Key(KeyAction),
    }

    #[derive(Clone, Default)]
    struct RecordingInjector {
        log: Arc<Mutex<Vec<Injected>>>,
        fail: bool,
    }

    impl InputInjector for RecordingInjector {
        fn mouse(&mut self, action: MouseAction) -> Result<(), InjectError> {
            if self.fail {
                return Err(InjectError::Inject("no display".to_string()));
            }
            self.log.lock().unwrap().push(Injected::Mouse(action));
            Ok(())
        }

        fn key(&mut self, action: KeyAction) -> Result<(), InjectError> {
            if self.fail {
                return Err(InjectError::Inject("no display".to_string()));
            }
            self.log.lock().unwrap().push(Injected::Key(action));
            Ok(())
        }
    }

    fn manager_with(
        width: u32,
        height: u32,
    ) -> (SessionManager, Arc<Mutex<usize>>, Arc<Mutex<Vec<Injected>>>) {
        let captures = Arc::new(Mutex::new(0));
        let injector = RecordingInjector::default();
        let log = injector.log.clone();
        let manager = SessionManager::new(
            Box::new(FakeScreen {
                width,
                height,
                captures: captures.clone(),
            }),
            Box::new(injector),
        );
        (manager, captures, log)
    }

    fn start(id: &str) -> Frame {
        Frame::RemoteSessionStart {
            session_id: id.to_string(),
        }
    }

    fn capture(id: &str) -> Frame {
        Frame::CaptureScreen {
            session_id: id.to_string(),
        }
    }

    #[test]
    fn capture_without_start_emits_nothing() {
        let (mut manager, captures, _) = manager_with(1920, 1080);
        for _ in 0..3 {
            assert_eq!(manager.handle_frame(capture("ghost")), None);
        }
        assert_eq!(*captures.lock().unwrap(), 0);
    }

    #[test]
    fn capture_after_start_emits_downscaled_screen_data() {
        let (mut manager, _, _) = manager_with(1920, 1080);
        manager.handle_frame(start("s1"));

        let reply = manager.handle_frame(capture("s1")).unwrap();
        match reply {
            Frame::ScreenData { session_id, data } => {
                assert_eq!(session_id, "s1");
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(&data)
                    .unwrap();
                let image = screenshots::image::load_from_memory(&bytes).unwrap();
                assert_eq!(image.width(), 1280);
                assert_eq!(image.height(), 720);
            }
            other => panic!("expected screen_data, got {:?}", other),
        }
    }

    #[test]
    fn ended_session_absorbs_all_following_frames() {
        let (mut manager, captures, log) = manager_with(800, 600);
        manager.handle_frame(start("s1"));
        manager.handle_frame(Frame::RemoteSessionEnd {
            session_id: "s1".to_string(),
        });

        assert_eq!(manager.handle_frame(capture("s1")), None);
        assert_eq!(
            manager.handle_frame(Frame::MouseEvent {
                session_id: "s1".to_string(),
                data: MouseEventData {
                    kind: MouseEventKind::Click,
                    x: 1,
                    y: 2,
                    button: Some(0),
                },
            }),
            None
        );
        assert_eq!(
            manager.handle_frame(Frame::KeyboardEvent {
                session_id: "s1".to_string(),
                data: KeyboardEventData {
                    kind: KeyboardEventKind::Keydown,
                    key: "Enter".to_string(),
                    ctrl_key: false,
                    alt_key: false,
                    shift_key: false,
                },
            }),
            None
        );
        assert_eq!(*captures.lock().unwrap(), 0);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn end_of_unknown_session_is_a_noop() {
        let (mut manager, _, _) = manager_with(800, 600);
        assert_eq!(
            manager.handle_frame(Frame::RemoteSessionEnd {
                session_id: "never-started".to_string(),
            }),
            None
        );
        assert_eq!(manager.active_sessions(), 0);
    }

    #[test]
    fn repeated_start_is_idempotent() {
        let (mut manager, _, _) = manager_with(800, 600);
        manager.handle_frame(start("s1"));
        let first = manager.sessions.get("s1").unwrap().started_at;
        manager.handle_frame(start("s1"));
        let second = manager.sessions.get("s1").unwrap().started_at;
        assert_eq!(manager.active_sessions(), 1);
        assert!(second >= first);
    }

    #[test]
    fn ping_gets_pong_without_any_session() {
        let (mut manager, _, _) = manager_with(800, 600);
        assert_eq!(manager.handle_frame(Frame::Ping), Some(Frame::Pong));
    }

    #[test]
    fn active_session_routes_input() {
        let (mut manager, _, log) = manager_with(800, 600);
        manager.handle_frame(start("s1"));

        manager.handle_frame(Frame::MouseEvent {
            session_id: "s1".to_string(),
            data: MouseEventData {
                kind: MouseEventKind::Mousemove,
                x: 10,
                y: 20,
                button: None,
            },
        });
        manager.handle_frame(Frame::KeyboardEvent {
            session_id: "s1".to_string(),
            data: KeyboardEventData {
                kind: KeyboardEventKind::Keydown,
                key: "Enter".to_string(),
                ctrl_key: false,
                alt_key: false,
                shift_key: false,
            },
        });

        let log = log.lock().unwrap();
        assert_eq!(
            *log,
            vec![
                Injected::Mouse(MouseAction::Move { x: 10, y: 20 }),
                Injected::Key(KeyAction::Tap(NamedKey::Enter)),
            ]
        );
    }

    #[test]
    fn capture_failure_is_absorbed() {
        let mut manager =
            SessionManager::new(Box::new(BrokenScreen), Box::new(RecordingInjector::default()));
        manager.handle_frame(start("s1"));
        assert_eq!(manager.handle_frame(capture("s1")), None);
        // The session survives the failed capture.
        assert_eq!(manager.active_sessions(), 1);
    }

    #[test]
    fn injection_failure_is_absorbed() {
        let injector = RecordingInjector {
            fail: true,
            ..Default::default()
        };
        let mut manager = SessionManager::new(
            Box::new(FakeScreen {
                width: 640,
                height: 480,
                captures: Arc::new(Mutex::new(0)),
            }),
            Box::new(injector),
        );
        manager.handle_frame(start("s1"));
        manager.handle_frame(Frame::MouseEvent {
            session_id: "s1".to_string(),
            data: MouseEventData {
                kind: MouseEventKind::Click,
                x: 0,
                y: 0,
                button: Some(0),
            },
        });
        assert_eq!(manager.active_sessions(), 1);
    }
}
