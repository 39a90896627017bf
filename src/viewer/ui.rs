//! Rendering. Reads the viewer state, never changes it.

use super::{ThemeColors, ViewerState};
use crate::data::{finite_min_max, Dataset};
use crate::slicing::{line_path, AxisRole, ProjectedSlice, Region, StageId};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset as Series, GraphType, Paragraph, Wrap},
    Frame,
};

/// Horizontal character cells per heatmap pixel.
const PIXEL_WIDTH: usize = 2;

/// Draw the whole viewer.
pub fn draw(f: &mut Frame<'_>, state: &ViewerState) {
    let colors = ThemeColors::from_theme(state.theme);
    let session = state.session();
    let id = state.selected_view();

    let title = match session.path() {
        Some(p) => format!(" iaview - {} ", p.display()),
        None => " iaview ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.bg2))
        .style(Style::default().bg(colors.bg0));
    let inner = block.inner(f.area());
    f.render_widget(block, f.area());

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(inner);
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(36)])
        .split(rows[1]);

    let pipeline = session.pipeline();
    let input = pipeline.last_input(id).ok().flatten();
    let slice = pipeline.last_projection(id).ok().flatten();

    draw_header(f, rows[0], state, input.map(|d| &**d), &colors);
    match (input, slice) {
        (Some(input), Some(slice)) if slice.ndim() == 2 => {
            draw_heatmap(f, body[0], state, input, slice, &colors)
        }
        (Some(input), Some(slice)) => draw_plot(f, body[0], state, input, slice, &colors),
        _ => draw_message(f, body[0], &empty_reason(state, id), &colors),
    }
    draw_side_panel(f, body[1], state, input.map(|d| &**d), &colors);

    let status = Paragraph::new(state.status.as_str())
        .style(Style::default().fg(colors.fg0).bg(colors.bg1));
    f.render_widget(status, rows[2]);
    let keys = Paragraph::new(
        "q:quit Tab:view hjkl:cursor a:axis x/y/f:role +/-:index o:region e:on/off HJKL:move </>:size Enter:commit c:center p:palette T:theme",
    )
    .style(Style::default().fg(colors.green));
    f.render_widget(keys, rows[3]);
}

fn empty_reason(state: &ViewerState, id: StageId) -> String {
    let enabled = state
        .session()
        .pipeline()
        .selector(id)
        .ok()
        .flatten()
        .map(|s| s.is_enabled());
    match enabled {
        Some(false) => "Region disabled: select the parent view and press e".to_string(),
        _ => "Nothing to display (empty selection)".to_string(),
    }
}

fn draw_header(
    f: &mut Frame<'_>,
    area: Rect,
    state: &ViewerState,
    input: Option<&Dataset>,
    colors: &ThemeColors,
) {
    let session = state.session();
    let id = state.selected_view();
    let mut lines = vec![Line::from(vec![
        Span::styled(
            session.view_name(id),
            Style::default()
                .fg(colors.yellow)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  ({} views)", session.views().len()),
            Style::default().fg(colors.gray),
        ),
    ])];

    if let Some(ds) = input {
        let dims: Vec<String> = ds
            .labels()
            .iter()
            .zip(ds.shape())
            .map(|(label, len)| format!("{}:{}", label, len))
            .collect();
        let range = match ds.min_max() {
            Some((lo, hi)) => format!("  range {} .. {}", format_value(lo), format_value(hi)),
            None => String::new(),
        };
        lines.push(Line::from(vec![
            Span::styled("Shape: ", Style::default().fg(colors.green)),
            Span::styled(
                format!("[{}]", dims.join(", ")),
                Style::default().fg(colors.fg0),
            ),
            Span::styled(range, Style::default().fg(colors.gray)),
        ]));
    }

    let paragraph = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(colors.bg2)),
    );
    f.render_widget(paragraph, area);
}

fn draw_message(f: &mut Frame<'_>, area: Rect, message: &str, colors: &ThemeColors) {
    let para = Paragraph::new(message)
        .style(Style::default().fg(colors.gray))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    f.render_widget(para, area);
}

fn draw_side_panel(
    f: &mut Frame<'_>,
    area: Rect,
    state: &ViewerState,
    input: Option<&Dataset>,
    colors: &ThemeColors,
) {
    let session = state.session();
    let pipeline = session.pipeline();
    let id = state.selected_view();
    let mut lines = vec![Line::from(Span::styled(
        "Axes",
        Style::default().fg(colors.yellow),
    ))];

    if let (Some(ds), Some(roles)) = (input, pipeline.roles(id).ok().flatten()) {
        for (axis, spec) in ds.axes().axes().iter().enumerate() {
            let role = match roles.role(axis) {
                Ok(AxisRole::Fixed(index)) => format!(
                    "= {} [{}/{}]",
                    ds.axes().value_label(axis, index).unwrap_or_default(),
                    index,
                    spec.len().saturating_sub(1)
                ),
                Ok(role) => role.name().to_string(),
                Err(_) => "?".to_string(),
            };
            let style = if axis == state.active_axis() {
                Style::default().fg(colors.bg0).bg(colors.yellow)
            } else {
                Style::default().fg(colors.fg0)
            };
            lines.push(Line::from(vec![
                Span::styled(format!(" {:<8}", spec.label()), style),
                Span::styled(format!(" {}", role), Style::default().fg(colors.aqua)),
            ]));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Regions on this view",
        Style::default().fg(colors.yellow),
    )));
    let active = state.active_region_stage();
    for &child in pipeline.children(id).unwrap_or(&[]) {
        let Ok(Some(selector)) = pipeline.selector(child) else {
            continue;
        };
        let marker = if Some(child) == active { ">" } else { " " };
        let detail = match selector.region() {
            Some(region) => {
                let [a, b] = region.points();
                format!("({},{})-({},{})", a.0, a.1, b.0, b.1)
            }
            None => "off".to_string(),
        };
        lines.push(Line::from(vec![
            Span::styled(
                format!("{}{:<14}", marker, session.view_name(child)),
                Style::default().fg(colors.fg0),
            ),
            Span::styled(detail, Style::default().fg(colors.orange)),
        ]));
    }

    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::LEFT)
            .border_style(Style::default().fg(colors.bg2)),
    );
    f.render_widget(panel, area);
}

fn draw_heatmap(
    f: &mut Frame<'_>,
    area: Rect,
    state: &ViewerState,
    input: &Dataset,
    slice: &ProjectedSlice,
    colors: &ThemeColors,
) {
    let bounds = slice.bounds();
    let (cols, rows) = (bounds[0], bounds[1]);
    let (h_axis, v_axis) = (slice.free_axes[0], slice.free_axes[1]);
    let (min_val, max_val) = finite_min_max(slice.values.iter().copied()).unwrap_or((0.0, 1.0));
    let mut range = max_val - min_val;
    if range.abs() < 1e-10 {
        range = 1.0;
    }

    let (ch, cv) = state.cursor();
    let readout = slice
        .get(&[ch, cv])
        .map(format_value)
        .unwrap_or_else(|| "-".to_string());
    let title = format!(
        " {}={}, {}={}: {} | {} ",
        slice.labels[0],
        input.axes().value_label(h_axis, ch).unwrap_or_default(),
        slice.labels[1],
        input.axes().value_label(v_axis, cv).unwrap_or_default(),
        readout,
        state.palette.name()
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.bg2))
        .title(title)
        .title_style(Style::default().fg(colors.yellow));
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.width < 12 || inner.height < 4 {
        return;
    }

    // colourbar on top, x labels below, y labels on the left
    let left_margin = 9;
    let plot = Rect {
        x: inner.x + left_margin,
        y: inner.y + 1,
        width: inner.width.saturating_sub(left_margin),
        height: inner.height.saturating_sub(2),
    };
    draw_colorbar(f, inner, plot, state, (min_val, max_val), colors);

    let max_h = plot.height as usize;
    let max_w = plot.width as usize / PIXEL_WIDTH;
    if max_h == 0 || max_w == 0 {
        return;
    }
    let disp_rows = rows.min(max_h).max(1);
    let disp_cols = cols.min(max_w).max(1);
    let row_step = rows as f64 / disp_rows as f64;
    let col_step = cols as f64 / disp_cols as f64;

    // screen row 0 is the highest vertical index
    let to_screen = |h: usize, v: usize| -> (u16, u16) {
        let px = ((h as f64 / col_step).floor() as usize).min(disp_cols - 1);
        let py = ((v as f64 / row_step).floor() as usize).min(disp_rows - 1);
        (
            plot.x + (px * PIXEL_WIDTH) as u16,
            plot.y + (disp_rows - 1 - py) as u16,
        )
    };

    let buf = f.buffer_mut();
    for y in 0..disp_rows {
        let v = (((disp_rows - 1 - y) as f64 * row_step).floor() as usize).min(rows - 1);
        for px in 0..disp_cols {
            let h = ((px as f64 * col_step).floor() as usize).min(cols - 1);
            let value = slice.get(&[h, v]).unwrap_or(f64::NAN);
            for i in 0..PIXEL_WIDTH {
                let pos = (plot.x + (px * PIXEL_WIDTH + i) as u16, plot.y + y as u16);
                if let Some(cell) = buf.cell_mut(pos) {
                    if value.is_finite() {
                        cell.set_char('█')
                            .set_fg(state.palette.color((value - min_val) / range));
                    } else {
                        cell.set_char('·').set_fg(colors.gray);
                    }
                }
            }
        }
    }

    // regions drawn on this view
    let active = state.active_region_stage();
    let pipeline = state.session().pipeline();
    for &child in pipeline.children(state.selected_view()).unwrap_or(&[]) {
        let Some(region) = pipeline
            .selector(child)
            .ok()
            .flatten()
            .and_then(|s| s.region().copied())
        else {
            continue;
        };
        let color = if Some(child) == active {
            colors.orange
        } else {
            colors.aqua
        };
        for (h, v) in region_outline(&region, cols, rows) {
            let (x, y) = to_screen(h, v);
            for i in 0..PIXEL_WIDTH as u16 {
                if let Some(cell) = buf.cell_mut((x + i, y)) {
                    cell.set_char('▒').set_fg(color);
                }
            }
        }
    }

    let (x, y) = to_screen(ch.min(cols - 1), cv.min(rows - 1));
    for i in 0..PIXEL_WIDTH as u16 {
        if let Some(cell) = buf.cell_mut((x + i, y)) {
            cell.set_char('┼').set_fg(colors.yellow);
        }
    }

    // axis labels at both ends and the middle
    for v in [0, rows / 2, rows - 1] {
        let label: String = input
            .axes()
            .value_label(v_axis, v)
            .unwrap_or_default()
            .chars()
            .take(left_margin as usize - 1)
            .collect();
        let (_, y) = to_screen(0, v);
        let start = plot.x.saturating_sub(label.len() as u16 + 1);
        for (i, c) in label.chars().enumerate() {
            if let Some(cell) = buf.cell_mut((start + i as u16, y)) {
                cell.set_char(c).set_fg(colors.green);
            }
        }
    }
    let label_y = plot.y + disp_rows as u16;
    if label_y < inner.y + inner.height {
        for h in [0, cols / 2, cols - 1] {
            let label = input.axes().value_label(h_axis, h).unwrap_or_default();
            let (x, _) = to_screen(h, 0);
            for (i, c) in label.chars().take(8).enumerate() {
                let x = x + i as u16;
                if x < plot.x + plot.width {
                    if let Some(cell) = buf.cell_mut((x, label_y)) {
                        cell.set_char(c).set_fg(colors.green);
                    }
                }
            }
        }
    }
}

fn draw_colorbar(
    f: &mut Frame<'_>,
    inner: Rect,
    plot: Rect,
    state: &ViewerState,
    (min_val, max_val): (f64, f64),
    colors: &ThemeColors,
) {
    let width = 30.min((plot.width as usize).saturating_sub(20));
    if width == 0 {
        return;
    }
    let start = plot.x + (plot.width as usize - width) as u16 / 2;
    let buf = f.buffer_mut();
    for i in 0..width {
        let t = i as f64 / width as f64;
        if let Some(cell) = buf.cell_mut((start + i as u16, inner.y)) {
            cell.set_char('█').set_fg(state.palette.color(t));
        }
    }
    let min_label = format_value(min_val);
    let min_x = start.saturating_sub(min_label.len() as u16 + 1);
    let max_x = start + width as u16 + 1;
    for (x0, label) in [(min_x, min_label), (max_x, format_value(max_val))] {
        for (i, c) in label.chars().enumerate() {
            let x = x0 + i as u16;
            if x < inner.x + inner.width {
                if let Some(cell) = buf.cell_mut((x, inner.y)) {
                    cell.set_char(c).set_fg(colors.green);
                }
            }
        }
    }
}

/// Index points to highlight for a region, clamped into the view.
fn region_outline(region: &Region, cols: usize, rows: usize) -> Vec<(usize, usize)> {
    let clamp = |(h, v): (i64, i64)| {
        (
            h.clamp(0, cols as i64 - 1) as usize,
            v.clamp(0, rows as i64 - 1) as usize,
        )
    };
    match *region {
        Region::Line { endpoints: [a, b] } => line_path(clamp(a), clamp(b)),
        Region::Rectangle { .. } => {
            let [lo, _, hi, _] = region.corners();
            let (h0, v0) = clamp(lo);
            let (h1, v1) = clamp(hi);
            let mut points = Vec::new();
            for h in h0..=h1 {
                points.push((h, v0));
                points.push((h, v1));
            }
            for v in v0..=v1 {
                points.push((h0, v));
                points.push((h1, v));
            }
            points
        }
    }
}

fn draw_plot(
    f: &mut Frame<'_>,
    area: Rect,
    state: &ViewerState,
    input: &Dataset,
    slice: &ProjectedSlice,
    colors: &ThemeColors,
) {
    let axis = slice.free_axes[0];
    let transform = slice.transform(0).unwrap_or(crate::data::AxisTransform::IDENTITY);
    let series: Vec<(f64, f64)> = slice
        .values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_finite())
        .map(|(i, &v)| (transform.to_coordinate(i as f64), v))
        .collect();
    if series.is_empty() {
        draw_message(f, area, "No finite values to plot", colors);
        return;
    }

    let (x_min, x_max) = finite_min_max(series.iter().map(|p| p.0)).unwrap_or((0.0, 1.0));
    let (v_min, v_max) = finite_min_max(series.iter().map(|p| p.1)).unwrap_or((0.0, 1.0));
    let padding = ((v_max - v_min).abs() * 0.15).max(1e-9);
    let (y_min, y_max) = (v_min - padding, v_max + padding);

    let cursor = state.cursor().0.min(slice.values.len().saturating_sub(1));
    let cursor_x = transform.to_coordinate(cursor as f64);
    let cursor_line = [(cursor_x, y_min), (cursor_x, y_max)];
    let datasets = vec![
        Series::default()
            .name(slice.labels[0].as_str())
            .marker(ratatui::symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(state.palette.color(0.6)))
            .data(&series),
        Series::default()
            .graph_type(GraphType::Line)
            .style(Style::default().fg(colors.yellow))
            .data(&cursor_line),
    ];

    let readout = format!(
        " {}={}: {} ",
        slice.labels[0],
        input.axes().value_label(axis, cursor).unwrap_or_default(),
        slice
            .get(&[cursor])
            .map(format_value)
            .unwrap_or_else(|| "-".to_string())
    );
    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.bg2))
                .title(readout)
                .title_style(Style::default().fg(colors.yellow)),
        )
        .x_axis(
            Axis::default()
                .title(slice.labels[0].clone())
                .style(Style::default().fg(colors.fg0))
                .bounds([x_min, x_max.max(x_min + 1e-9)])
                .labels(vec![
                    format_value(x_min),
                    format_value((x_min + x_max) / 2.0),
                    format_value(x_max),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("Value")
                .style(Style::default().fg(colors.fg0))
                .bounds([y_min, y_max])
                .labels(vec![
                    format_value(y_min),
                    format_value((y_min + y_max) / 2.0),
                    format_value(y_max),
                ]),
        );
    f.render_widget(chart, area);
}

/// Compact number formatting for labels and readouts.
fn format_value(val: f64) -> String {
    if !val.is_finite() {
        return if val.is_nan() {
            "NaN".to_string()
        } else if val.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        };
    }
    let abs_val = val.abs();
    if abs_val == 0.0 {
        "0".to_string()
    } else if !(1e-3..1e5).contains(&abs_val) {
        format!("{:.2e}", val)
    } else if abs_val >= 100.0 {
        format!("{:.1}", val)
    } else {
        format!("{:.3}", val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use crate::viewer::ViewerState;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ndarray::{Array, IxDyn};
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn rectangle_outline_is_clamped() {
        let points = region_outline(&Region::rectangle((-2, 1), (10, 2)), 4, 3);
        assert!(points.iter().all(|&(h, v)| h < 4 && v < 3));
        assert!(points.contains(&(0, 1)));
        assert!(points.contains(&(3, 2)));
    }

    #[test]
    fn format_value_ranges() {
        assert_eq!(format_value(0.0), "0");
        assert_eq!(format_value(1.5), "1.500");
        assert_eq!(format_value(250.0), "250.0");
        assert_eq!(format_value(f64::NAN), "NaN");
    }

    fn press(state: &mut ViewerState, code: KeyCode) {
        state.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn render(state: &mut ViewerState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        state.prepare().unwrap();
        terminal.draw(|f| draw(f, state)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn draws_heatmap_and_plot_views() {
        let array = Array::from_shape_fn(IxDyn(&[6, 5]), |ix| (ix[0] * ix[1]) as f64);
        let session = Session::new(Dataset::from_array(array).unwrap()).unwrap();
        let mut state = ViewerState::new(session);
        assert!(render(&mut state).contains("main"));

        // enable the line cut on the main view, then show the 1-D view
        let cut = state.session().line_cuts()[0];
        while state.active_region_stage() != Some(cut) {
            press(&mut state, KeyCode::Char('o'));
        }
        press(&mut state, KeyCode::Char('e'));
        while state.selected_view() != cut {
            press(&mut state, KeyCode::Tab);
        }
        let text = render(&mut state);
        assert!(text.contains("cut 1"));
        assert!(!text.contains("Region disabled"));
    }
}
