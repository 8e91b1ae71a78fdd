use {
    crate::{
        player::PlayerDetailRecord,
        state::{DashboardState, View},
        ui::renderer::{format_km, format_optional, format_timestamp},
    },
    ratatui::{
        layout::{Constraint, Direction, Layout as RatLayout, Rect},
        style::{Color, Modifier, Style},
        text::{Line, Span},
        widgets::{Block, Borders, Paragraph, Row, Table, TableState},
        Frame,
    },
};

/// Render the whole dashboard
pub fn render_layout(f: &mut Frame, area: Rect, state: &DashboardState, source: &str) {
    let chunks = RatLayout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Tables
            Constraint::Length(3), // Footer/Status
        ])
        .split(area);

    render_header(f, chunks[0], state, source);

    match state.detail() {
        Some(detail) => {
            let body = RatLayout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(chunks[1]);
            render_main_table(f, body[0], state);
            render_detail(f, body[1], detail);
        }
        None => render_main_table(f, chunks[1], state),
    }

    render_footer(f, chunks[2], state);
}

fn render_header(f: &mut Frame, area: Rect, state: &DashboardState, source: &str) {
    let online = state.online();
    let text = vec![
        Line::from(vec![
            Span::styled(
                "World Stats",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" - {}", source)),
        ]),
        Line::from(vec![
            Span::styled("Players: ", Style::default().fg(Color::Cyan)),
            Span::raw(state.player_count().to_string()),
            Span::raw(" | "),
            Span::styled("Online: ", Style::default().fg(Color::Green)),
            Span::raw(online.count.to_string()),
            Span::raw(" | "),
            Span::styled("Sort: ", Style::default().fg(Color::Yellow)),
            Span::raw(state.sort().label()),
        ]),
    ];

    let block = Block::default().borders(Borders::ALL);
    f.render_widget(Paragraph::new(text).block(block), area);
}

fn render_main_table(f: &mut Frame, area: Rect, state: &DashboardState) {
    let header_style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);

    let (header, rows, widths) = match state.view() {
        View::Leaderboard => {
            let header = Row::new(vec!["#", "Player", "Kills", "Deaths", "Level", "XP", "HP", "Energy"])
                .style(header_style);
            let rows: Vec<Row> = state
                .leaderboard()
                .iter()
                .enumerate()
                .map(|(i, r)| {
                    Row::new(vec![
                        (i + 1).to_string(),
                        r.identity.name.clone(),
                        r.mob_kills.to_string(),
                        r.deaths.to_string(),
                        format_optional(r.level),
                        format_optional(r.xp),
                        format_optional(r.hp),
                        format_optional(r.energy),
                    ])
                })
                .collect();
            let widths = vec![
                Constraint::Length(4),
                Constraint::Min(16),
                Constraint::Length(8),
                Constraint::Length(8),
                Constraint::Length(7),
                Constraint::Length(10),
                Constraint::Length(7),
                Constraint::Length(8),
            ];
            (header, rows, widths)
        }
        View::Roster => {
            let header = Row::new(vec!["", "Player", "Level", "Kills"]).style(header_style);
            let rows: Vec<Row> = state
                .roster()
                .iter()
                .map(|p| {
                    let (marker, color) = if p.online {
                        ("●", Color::Green)
                    } else {
                        ("○", Color::DarkGray)
                    };
                    Row::new(vec![
                        marker.to_string(),
                        p.summary.identity.name.clone(),
                        format_optional(p.summary.level),
                        p.summary.mob_kills.to_string(),
                    ])
                    .style(Style::default().fg(color))
                })
                .collect();
            let widths = vec![
                Constraint::Length(2),
                Constraint::Min(16),
                Constraint::Length(7),
                Constraint::Length(8),
            ];
            (header, rows, widths)
        }
    };

    let title = match state.view() {
        View::Leaderboard => format!("{} (by {})", View::Leaderboard.title(), state.sort().label()),
        View::Roster => View::Roster.title().to_string(),
    };

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");

    let mut table_state = TableState::default().with_selected(Some(state.selected()));
    f.render_stateful_widget(table, area, &mut table_state);
}

fn render_detail(f: &mut Frame, area: Rect, detail: &PlayerDetailRecord) {
    let label = Style::default().fg(Color::Cyan);
    let vanilla = &detail.vanilla;
    let modded = &detail.mod_metrics;

    let field = |name: &str, value: String| {
        Line::from(vec![Span::styled(format!("{:<12}", name), label), Span::raw(value)])
    };

    let mut lines = vec![
        Line::from(Span::styled(
            detail.identity.uuid.clone(),
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(""),
        field("Kills", vanilla.mob_kills.to_string()),
        field("Deaths", vanilla.deaths.to_string()),
        field("Play time", vanilla.play_time_hms.clone()),
        field("Walked", format_km(vanilla.walk_km)),
        field("Flown", format_km(vanilla.fly_km)),
        field("Jumps", vanilla.jumps.to_string()),
        Line::from(""),
        field("Level", format_optional(modded.level)),
        field("XP", format_optional(modded.xp)),
        field("HP", format_optional(modded.hp)),
        field("Energy", format_optional(modded.energy)),
    ];

    if !vanilla.top_mobs.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Top mobs",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        for mob in &vanilla.top_mobs {
            lines.push(Line::from(format!("  {:<20} {}", mob.name, mob.count)));
        }
    }

    if !vanilla.coins.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Coins",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        for (coin, count) in &vanilla.coins {
            lines.push(Line::from(format!("  {:<20} {}", coin, count)));
        }
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .title(detail.identity.name.clone());
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_footer(f: &mut Frame, area: Rect, state: &DashboardState) {
    let status = match (state.last_error(), state.is_refreshing()) {
        (_, true) => Span::styled("Refreshing...", Style::default().fg(Color::Yellow)),
        (Some(err), false) => Span::styled(format!("Error: {}", err), Style::default().fg(Color::Red)),
        (None, false) => Span::styled("OK", Style::default().fg(Color::Green)),
    };
    let updated = state
        .last_refresh()
        .map_or_else(|| "never".to_string(), format_timestamp);

    let text = vec![Line::from(vec![
        Span::styled("Status: ", Style::default().fg(Color::Green)),
        status,
        Span::raw(" | "),
        Span::styled("Updated: ", Style::default().fg(Color::Cyan)),
        Span::raw(updated),
        Span::raw(" | q quit  Tab view  k/l sort  ↑/↓ select  Enter detail  r refresh"),
    ])];

    let footer = Block::default().borders(Borders::ALL).title("Status");
    f.render_widget(Paragraph::new(text).block(footer), area);
}
