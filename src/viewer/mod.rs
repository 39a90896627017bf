//! Interactive terminal viewer.
//!
//! [`ViewerState`] maps keys onto pipeline operations and keeps only
//! presentation state (selected view, cursor, palette). Rendering lives in
//! [`ui`]; colour normalisation lives in [`colormaps`].

pub mod colormaps;
pub mod theme;
pub mod ui;

pub use colormaps::ColorPalette;
pub use theme::{Theme, ThemeColors};

use crate::error::{IauError, Result};
use crate::session::Session;
use crate::slicing::{AxisRole, PipelineEvent, Region, RegionUpdate, StageId};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::cell::RefCell;
use std::io;
use std::rc::Rc;
use std::time::Duration;

/// Viewer state over one session.
#[derive(Debug)]
pub struct ViewerState {
    session: Session,
    /// Position in [`Session::views`].
    selected: usize,
    /// Axis of the selected view the role keys act on.
    active_axis: usize,
    /// Child of the selected view whose region the region keys act on.
    active_child: usize,
    /// Heatmap cursor, `(horizontal, vertical)` index.
    cursor: (usize, usize),
    /// Heatmap colours.
    pub palette: ColorPalette,
    /// UI colours.
    pub theme: Theme,
    /// Status line.
    pub status: String,
    events: Rc<RefCell<Vec<PipelineEvent>>>,
    quit: bool,
}

impl ViewerState {
    /// Viewer showing the main view of `session`.
    pub fn new(mut session: Session) -> Self {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        session
            .pipeline_mut()
            .subscribe(move |e| sink.borrow_mut().push(*e));
        Self {
            session,
            selected: 0,
            active_axis: 0,
            active_child: 0,
            cursor: (0, 0),
            palette: ColorPalette::default(),
            theme: Theme::default(),
            status: "Ready".to_string(),
            events,
            quit: false,
        }
    }

    /// The session being viewed.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Stage currently shown.
    pub fn selected_view(&self) -> StageId {
        let views = self.session.views();
        views
            .get(self.selected)
            .copied()
            .unwrap_or_else(|| self.session.main_view())
    }

    /// Axis the role keys act on.
    pub fn active_axis(&self) -> usize {
        self.active_axis
    }

    /// Heatmap cursor.
    pub fn cursor(&self) -> (usize, usize) {
        self.cursor
    }

    /// Stage whose region is drawn on (and edited from) the selected view.
    pub fn active_region_stage(&self) -> Option<StageId> {
        let children = self
            .session
            .pipeline()
            .children(self.selected_view())
            .ok()?;
        children.get(self.active_child).copied()
    }

    /// Region drawn on the selected view by the active child, if enabled.
    pub fn active_region(&self) -> Option<Region> {
        let stage = self.active_region_stage()?;
        let selector = self.session.pipeline().selector(stage).ok()??;
        selector.region().copied()
    }

    /// Whether the user asked to leave.
    pub fn should_quit(&self) -> bool {
        self.quit
    }

    /// Bring every view up to date before drawing.
    pub fn prepare(&mut self) -> Result<()> {
        let id = self.selected_view();
        let pipeline = self.session.pipeline_mut();
        pipeline.settle()?;
        let bounds = pipeline
            .last_projection(id)?
            .map(|slice| slice.bounds());
        if let Some(bounds) = bounds {
            let h_max = bounds.first().copied().unwrap_or(1).saturating_sub(1);
            let v_max = bounds.get(1).copied().unwrap_or(1).saturating_sub(1);
            self.cursor = (self.cursor.0.min(h_max), self.cursor.1.min(v_max));
        }
        Ok(())
    }

    /// Apply one key press. Errors from the core end up on the status line.
    pub fn handle_key(&mut self, key: KeyEvent) {
        self.events.borrow_mut().clear();
        if let Err(e) = self.dispatch(key) {
            tracing::debug!("Key {:?} rejected: {}", key.code, e);
            self.status = format!("Error: {}", e);
            return;
        }
        let summary: Vec<String> = self
            .events
            .borrow()
            .iter()
            .map(|event| match event {
                PipelineEvent::Refreshed(id) => format!("{} updated", self.session.view_name(*id)),
                PipelineEvent::Cleared(id) => format!("{} cleared", self.session.view_name(*id)),
            })
            .collect();
        if !summary.is_empty() {
            self.status = summary.join(", ");
        }
    }

    fn dispatch(&mut self, key: KeyEvent) -> Result<()> {
        match (key.modifiers, key.code) {
            (_, KeyCode::Char('q')) | (_, KeyCode::Esc) => self.quit = true,

            (KeyModifiers::NONE, KeyCode::Tab) => self.cycle_view(1),
            (_, KeyCode::BackTab) => self.cycle_view(-1),

            // cursor
            (KeyModifiers::NONE, KeyCode::Left) | (KeyModifiers::NONE, KeyCode::Char('h')) => {
                self.move_cursor(-1, 0)
            }
            (KeyModifiers::NONE, KeyCode::Right) | (KeyModifiers::NONE, KeyCode::Char('l')) => {
                self.move_cursor(1, 0)
            }
            (KeyModifiers::NONE, KeyCode::Up) | (KeyModifiers::NONE, KeyCode::Char('k')) => {
                self.move_cursor(0, 1)
            }
            (KeyModifiers::NONE, KeyCode::Down) | (KeyModifiers::NONE, KeyCode::Char('j')) => {
                self.move_cursor(0, -1)
            }

            // axes
            (KeyModifiers::NONE, KeyCode::Char('a')) => self.cycle_axis(),
            (KeyModifiers::NONE, KeyCode::Char('x')) => self.assign_active(AxisRole::Horizontal)?,
            (KeyModifiers::NONE, KeyCode::Char('y')) => self.assign_active(AxisRole::Vertical)?,
            (KeyModifiers::NONE, KeyCode::Char('f')) => self.fix_active()?,
            (_, KeyCode::Char('+')) | (_, KeyCode::Char(']')) | (_, KeyCode::PageUp) => {
                self.step_fixed_index(1)?
            }
            (_, KeyCode::Char('-')) | (_, KeyCode::Char('[')) | (_, KeyCode::PageDown) => {
                self.step_fixed_index(-1)?
            }

            // regions drawn on this view
            (KeyModifiers::NONE, KeyCode::Char('o')) => self.cycle_region(),
            (KeyModifiers::NONE, KeyCode::Char('e')) => self.toggle_region()?,
            (KeyModifiers::NONE, KeyCode::Char('c')) => self.center_region()?,
            (_, KeyCode::Char('H')) => self.drag_region(|r| r.translated(-1, 0))?,
            (_, KeyCode::Char('L')) => self.drag_region(|r| r.translated(1, 0))?,
            (_, KeyCode::Char('K')) => self.drag_region(|r| r.translated(0, 1))?,
            (_, KeyCode::Char('J')) => self.drag_region(|r| r.translated(0, -1))?,
            (_, KeyCode::Char('>')) => self.drag_region(|r| r.resized(1, 1))?,
            (_, KeyCode::Char('<')) => self.drag_region(|r| r.resized(-1, -1))?,
            (KeyModifiers::NONE, KeyCode::Enter) => self.commit_region()?,

            // presentation
            (KeyModifiers::NONE, KeyCode::Char('p')) => {
                self.palette = self.palette.next();
                self.status = format!("Palette: {}", self.palette.name());
            }
            (_, KeyCode::Char('T')) => {
                self.theme = self.theme.next();
                self.status = format!("Theme: {}", self.theme.name());
            }
            _ => {}
        }
        Ok(())
    }

    fn cycle_view(&mut self, delta: isize) {
        let count = self.session.views().len() as isize;
        self.selected = (self.selected as isize + delta).rem_euclid(count) as usize;
        self.active_axis = 0;
        self.active_child = 0;
        self.cursor = (0, 0);
        self.status = format!("View: {}", self.session.view_name(self.selected_view()));
    }

    fn move_cursor(&mut self, dh: isize, dv: isize) {
        self.cursor.0 = self.cursor.0.saturating_add_signed(dh);
        self.cursor.1 = self.cursor.1.saturating_add_signed(dv);
    }

    fn cycle_axis(&mut self) {
        let ndim = self
            .session
            .pipeline()
            .roles(self.selected_view())
            .ok()
            .flatten()
            .map_or(0, |roles| roles.ndim());
        if ndim > 0 {
            self.active_axis = (self.active_axis + 1) % ndim;
        }
    }

    fn assign_active(&mut self, role: AxisRole) -> Result<()> {
        let id = self.selected_view();
        let axis = self.active_axis;
        self.session.pipeline_mut().assign_role(id, axis, role)?;
        self.status = format!("Axis {} is now the {}", axis, role.name());
        Ok(())
    }

    /// Fix the active axis, keeping its index if it is already fixed.
    fn fix_active(&mut self) -> Result<()> {
        let current = self
            .session
            .pipeline()
            .roles(self.selected_view())?
            .map(|roles| roles.role(self.active_axis))
            .transpose()?;
        match current {
            Some(AxisRole::Fixed(index)) => {
                self.status = format!("Axis {} is already fixed at {}", self.active_axis, index);
                Ok(())
            }
            _ => self.assign_active(AxisRole::Fixed(0)),
        }
    }

    fn step_fixed_index(&mut self, delta: isize) -> Result<()> {
        let id = self.selected_view();
        let axis = self.active_axis;
        let (current, len) = {
            let roles = self
                .session
                .pipeline()
                .roles(id)?
                .ok_or_else(|| IauError::Validation("this view has no data".to_string()))?;
            match roles.role(axis)? {
                AxisRole::Fixed(index) => (index, roles.extents()[axis]),
                free => {
                    return Err(IauError::InvalidRole(format!(
                        "axis {} is the {}",
                        axis,
                        free.name()
                    )))
                }
            }
        };
        let next = current
            .saturating_add_signed(delta)
            .min(len.saturating_sub(1));
        if next != current {
            self.session
                .pipeline_mut()
                .set_fixed_index(id, axis, next)?;
        }
        Ok(())
    }

    fn cycle_region(&mut self) {
        let count = self
            .session
            .pipeline()
            .children(self.selected_view())
            .map_or(0, <[StageId]>::len);
        if count > 0 {
            self.active_child = (self.active_child + 1) % count;
            if let Some(stage) = self.active_region_stage() {
                self.status = format!("Region: {}", self.session.view_name(stage));
            }
        }
    }

    fn require_region_stage(&self) -> Result<StageId> {
        self.active_region_stage()
            .ok_or_else(|| IauError::Validation("no region can be drawn on this view".to_string()))
    }

    fn toggle_region(&mut self) -> Result<()> {
        let stage = self.require_region_stage()?;
        let enabled = self
            .session
            .pipeline()
            .selector(stage)?
            .is_some_and(|s| s.is_enabled());
        if enabled {
            self.session.pipeline_mut().disable_region(stage)?;
            self.status = format!("{} disabled", self.session.view_name(stage));
        } else {
            self.session.pipeline_mut().enable_region(stage)?;
        }
        Ok(())
    }

    fn center_region(&mut self) -> Result<()> {
        let stage = self.require_region_stage()?;
        self.session.pipeline_mut().center_region(stage)?;
        Ok(())
    }

    fn drag_region(&mut self, edit: impl FnOnce(&Region) -> Region) -> Result<()> {
        let stage = self.require_region_stage()?;
        let region = self
            .active_region()
            .ok_or_else(|| IauError::Validation("enable the region first (e)".to_string()))?;
        self.session
            .pipeline_mut()
            .update_region(stage, edit(&region), RegionUpdate::Dragging)
    }

    fn commit_region(&mut self) -> Result<()> {
        let stage = self.require_region_stage()?;
        let region = self
            .active_region()
            .ok_or_else(|| IauError::Validation("enable the region first (e)".to_string()))?;
        self.session
            .pipeline_mut()
            .update_region(stage, region, RegionUpdate::Finished)
    }
}

/// Open the terminal, run the viewer until the user quits, restore the terminal.
pub fn run(session: Session) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_loop(&mut terminal, ViewerState::new(session));

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    res
}

fn run_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut state: ViewerState,
) -> Result<()> {
    loop {
        state.prepare()?;
        terminal.draw(|f| ui::draw(f, &state))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                state.handle_key(key);
            }
        }
        if state.should_quit() {
            tracing::info!("Viewer closed");
            return Ok(());
        }
    }
}
