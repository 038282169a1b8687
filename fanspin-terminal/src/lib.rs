//! Terminal viewer for the fan animation

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use fanspin_core::{FanConfig, FanScene, SceneError, SpinCommand, SpinController, ViewerConfig};
use std::io::{self, stdout, Write};
use std::time::{Duration, Instant};

pub mod renderer;

pub use renderer::AsciiRenderer;

/// Terminal cells are roughly twice as tall as they are wide.
const CELL_ASPECT: f32 = 0.5;

/// Rows at the top of the screen used by the status overlay.
const HUD_ROWS: u16 = 2;

/// Where the main loop gets its input from.
trait EventSource {
    /// Next event, waiting at most `timeout` for one.
    fn next_event(&mut self, timeout: Duration) -> io::Result<Option<Event>>;
}

struct TerminalEvents;

impl EventSource for TerminalEvents {
    fn next_event(&mut self, timeout: Duration) -> io::Result<Option<Event>> {
        if event::poll(timeout)? {
            event::read().map(Some)
        } else {
            Ok(None)
        }
    }
}

/// Interactive "window" showing the fan scene in the terminal
pub struct TerminalApp {
    fan: FanScene,
    spin: SpinController,
    renderer: AsciiRenderer,
    viewer: ViewerConfig,
    zoom_back: f32,
    running: bool,
    next_tick: Option<Instant>,
    status: String,
    last_frame: Instant,
    frame_count: u32,
    fps: f32,
}

impl TerminalApp {
    pub fn new(fan: FanScene, spin: SpinController, config: &FanConfig) -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Self::with_size(fan, spin, config, width, height)
    }

    /// Builds the viewer for a `width` x `height` cell terminal without
    /// touching the real one.
    pub fn with_size(
        fan: FanScene,
        spin: SpinController,
        config: &FanConfig,
        width: u16,
        height: u16,
    ) -> io::Result<Self> {
        let mut app = Self {
            fan,
            spin,
            renderer: AsciiRenderer::new(width as usize, height as usize, config.viewer.background),
            viewer: config.viewer.clone(),
            zoom_back: config.scene.zoom_back,
            running: true,
            next_tick: None,
            status: "Up/Down: speed  Left: stop  Right: reset  Q: close".to_string(),
            last_frame: Instant::now(),
            frame_count: 0,
            fps: 0.0,
        };
        app.fit_camera()?;
        log::info!("The viewer is set up ({width}x{height} cells)");
        Ok(app)
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn scene(&self) -> &FanScene {
        &self.fan
    }

    pub fn spin(&self) -> &SpinController {
        &self.spin
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// Hands back the scene once the window has been closed.
    pub fn into_scene(self) -> FanScene {
        self.fan
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        let mut out = stdout();
        let title = self.viewer.title.clone();
        let result = execute!(
            out,
            terminal::EnterAlternateScreen,
            terminal::SetTitle(title),
            cursor::Hide
        )
        .and_then(|_| self.main_loop(&mut TerminalEvents, &mut out));

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(out, ResetColor, terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop<E: EventSource, W: Write>(&mut self, events: &mut E, out: &mut W) -> io::Result<()> {
        let frame_time = self.spin.interval();
        let mut next_frame = Instant::now();

        while self.running {
            // Handle input until the next frame is due
            let wait = next_frame.saturating_duration_since(Instant::now());
            if let Some(event) = events.next_event(wait)? {
                self.handle_event(event)?;
            }

            let now = Instant::now();
            if !self.running || now < next_frame {
                continue;
            }
            self.advance(now)?;
            self.render(out)?;
            next_frame = now + frame_time;

            // Update FPS counter
            self.frame_count += 1;
            if (now - self.last_frame).as_secs() >= 1 {
                self.fps = self.frame_count as f32 / (now - self.last_frame).as_secs_f32();
                self.frame_count = 0;
                self.last_frame = now;
            }
        }

        Ok(())
    }

    fn handle_event(&mut self, event: Event) -> io::Result<()> {
        match event {
            Event::Key(key) => {
                self.handle_key(key, Instant::now());
            }
            Event::Resize(width, height) => {
                self.renderer.resize(width as usize, height as usize);
                self.fit_camera()?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Applies one key event. Returns true when the key was handled.
    ///
    /// Arrow keys only reach the spin controller when the scene has an event
    /// callback node; each one re-arms the tick timer from `now`.
    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        if key.kind == KeyEventKind::Release {
            return false;
        }

        let command = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.running = false;
                return true;
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.running = false;
                return true;
            }
            KeyCode::Up => SpinCommand::SpeedUp,
            KeyCode::Down => SpinCommand::SlowDown,
            KeyCode::Left => SpinCommand::Stop,
            KeyCode::Right => SpinCommand::Reset,
            _ => return false,
        };

        if !self.fan.scene.has_event_callback() {
            return false;
        }

        let status = self.spin.handle(command);
        log::debug!("{command:?}: {status}");
        self.status = status.to_string();
        self.next_tick = Some(now + self.spin.interval());
        true
    }

    /// Runs the timer: applies a spin tick when one is due at `now`.
    ///
    /// Returns true when a tick ran.
    pub fn advance(&mut self, now: Instant) -> io::Result<bool> {
        match self.next_tick {
            Some(due) if now >= due => {}
            _ => return Ok(false),
        }
        self.next_tick = Some(now + self.spin.interval());

        let Some(step) = self.spin.tick() else {
            return Ok(false);
        };
        let rotation = self.fan.rotation;
        let current = self.fan.scene.rotation(rotation).map_err(scene_error)?;
        self.fan
            .scene
            .set_rotation(rotation, step.apply(current))
            .map_err(scene_error)?;
        Ok(true)
    }

    fn fit_camera(&mut self) -> io::Result<()> {
        let aspect = self.renderer.width() as f32 * CELL_ASPECT / self.renderer.height().max(1) as f32;
        self.fan.frame_camera(aspect, self.zoom_back).map_err(scene_error)
    }

    fn render<W: Write>(&mut self, out: &mut W) -> io::Result<()> {
        let camera = self.fan.scene.camera(self.fan.camera).map_err(scene_error)?;

        // Clear renderer
        self.renderer.clear();

        // Render meshes
        let items = self.fan.scene.render_items();
        self.renderer.render_items(&items, camera);

        // Output to terminal
        self.renderer.draw(out)?;

        // Draw UI overlay
        let headline = format!(
            "{} | {:.1} RPM (target {:.1}) | FPS: {:.1}",
            self.viewer.title,
            self.spin.rpm(),
            self.spin.target_rpm(),
            self.fps
        );
        let [r, g, b] = self.viewer.background;
        for (row, text) in (0..HUD_ROWS).zip([headline.as_str(), self.status.as_str()]) {
            queue!(
                out,
                cursor::MoveTo(0, row),
                SetBackgroundColor(Color::Rgb { r, g, b }),
                terminal::Clear(ClearType::CurrentLine),
                SetForegroundColor(Color::DarkRed),
                Print(text),
                ResetColor
            )?;
        }

        out.flush()?;
        Ok(())
    }
}

fn scene_error(e: SceneError) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}
