use crate::api::Resource;
use crate::app::{App, InputMode};
use crate::events::AppEvent;
use crate::form::EntityForm;
use crate::gate::Route;
use crate::list::{capitalize, Dialog, ListController, NoticeKind};
use crate::models::{initials, relative_time, ClientStatus, DealStage, NamedValue, Priority, SeriesPoint};
use chrono::{DateTime, Utc};
use crossterm::event::{self, Event as CEvent, KeyEventKind};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{
        Bar, BarChart, BarGroup, Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row,
        Table, TableState, Wrap,
    },
    Frame, Terminal,
};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;

fn centered_rect_absolute(width: u16, height: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length((r.height.saturating_sub(height)) / 2),
                Constraint::Length(height),
                Constraint::Length((r.height.saturating_sub(height) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Length((r.width.saturating_sub(width)) / 2),
                Constraint::Length(width),
                Constraint::Length((r.width.saturating_sub(width) + 1) / 2),
            ]
            .as_ref(),
        )
        .split(popup_layout[1])[1]
}

pub fn format_amount(value: f64) -> String {
    let rounded = value.round() as i64;
    let digits = rounded.unsigned_abs().to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(ch);
    }
    if rounded < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

pub fn format_change(change: f64) -> String {
    format!("{}{}%", if change > 0.0 { "+" } else { "" }, change)
}

fn format_date(at: &DateTime<Utc>) -> String {
    at.format("%d.%m.%Y").to_string()
}

fn status_color(status: &ClientStatus) -> Color {
    match status {
        ClientStatus::Active => Color::Green,
        ClientStatus::Inactive => Color::Gray,
        ClientStatus::Lead => Color::Blue,
        ClientStatus::Other(_) => Color::Gray,
    }
}

fn stage_color(stage: &DealStage) -> Color {
    match stage {
        DealStage::Lead => Color::Blue,
        DealStage::Negotiation => Color::Yellow,
        DealStage::Proposal => Color::Magenta,
        DealStage::Won => Color::Green,
        DealStage::Lost => Color::Red,
        DealStage::Other(_) => Color::Gray,
    }
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
    }
}

fn key_hint(key: &'static str, action: &'static str) -> [Span<'static>; 2] {
    [
        Span::styled(format!(" {} ", key), Style::default().fg(Color::Red)),
        Span::raw(format!(": {} ", action)),
    ]
}

fn get_legend(app: &App) -> Text<'static> {
    let hints: Vec<(&'static str, &'static str)> = match app.input_mode {
        InputMode::Normal if app.route.is_public() => vec![
            ("i", "Edit"),
            ("l", "Sign in"),
            ("r", "Register"),
            ("f", "Forgot password"),
            ("p", "Reset password"),
            ("q", "Quit"),
        ],
        InputMode::Normal => {
            let mut hints = vec![("q", "Quit"), ("Tab", "Next screen"), ("o", "Logout")];
            match app.route {
                Route::Clients | Route::Deals => hints.extend([
                    ("j/k", "Select"),
                    ("h/l", "Page"),
                    ("0-9", "Go to page"),
                    ("/", "Search"),
                    ("a", "Add"),
                    ("e", "Edit"),
                    ("d", "Delete"),
                    ("r", "Reload"),
                ]),
                Route::Dashboard => hints.extend([
                    ("j/k", "Select task"),
                    ("x", "Toggle done"),
                    ("a", "Add task"),
                    ("r", "Reload"),
                ]),
                Route::Analytics => hints.extend([("p", "Period"), ("r", "Reload")]),
                Route::Profile => hints.push(("i", "Edit")),
                _ => {}
            }
            hints
        }
        InputMode::Search => vec![("Enter", "Search"), ("Esc", "Cancel")],
        InputMode::GoToPage => vec![("0-9", "Page number"), ("Enter", "Go"), ("Esc", "Cancel")],
        InputMode::Form => vec![
            ("Tab", "Next field"),
            ("←/→", "Change choice"),
            ("Enter", "Save"),
            ("Esc", "Cancel"),
        ],
        InputMode::Confirm => vec![("y", "Delete"), ("n", "Cancel")],
        InputMode::QuickAdd => vec![
            ("!high", "Priority"),
            ("@YYYY-MM-DD", "Due"),
            ("Enter", "Add"),
            ("Esc", "Cancel"),
        ],
        InputMode::Auth => vec![("Tab", "Next field"), ("Enter", "Submit"), ("Esc", "Done")],
    };

    let mut lines = vec![Line::from(
        hints
            .into_iter()
            .flat_map(|(key, action)| key_hint(key, action))
            .collect::<Vec<_>>(),
    )];
    if let Some(notice) = app.notice() {
        let color = match notice.kind {
            NoticeKind::Success => Color::Green,
            NoticeKind::Error => Color::Red,
        };
        lines.push(Line::from(Span::styled(
            notice.message.clone(),
            Style::default().fg(color),
        )));
    }
    Text::from(lines)
}

fn render_sidebar(f: &mut Frame, area: Rect, app: &App) {
    let mut lines: Vec<Line> = Route::NAVIGATION
        .iter()
        .map(|route| {
            if *route == app.route {
                Line::from(Span::styled(
                    format!("> {}", route.title()),
                    Style::default()
                        .fg(Color::Green)
                        .add_modifier(Modifier::BOLD),
                ))
            } else {
                Line::from(format!("  {}", route.title()))
            }
        })
        .collect();

    if let Some(user) = &app.session.user {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            user.display_name(),
            Style::default().fg(Color::Cyan),
        )));
        lines.push(Line::from(user.email.clone()));
    }

    let sidebar = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("CRM"))
        .wrap(Wrap { trim: true });
    f.render_widget(sidebar, area);
}

fn pagination_line<R: Resource>(list: &ListController<R>, page_prompt: Option<&str>) -> Line<'static> {
    if let Some(input) = page_prompt {
        return Line::from(vec![
            Span::raw(format!("Go to page (1-{}): ", list.total_pages.max(1))),
            Span::styled(input.to_string(), Style::default().fg(Color::Yellow)),
        ]);
    }
    let enabled = Style::default().fg(Color::White);
    let disabled = Style::default().fg(Color::DarkGray);

    let mut spans = vec![Span::styled(
        "< Prev ",
        if list.has_previous() { enabled } else { disabled },
    )];
    for page in list.page_links() {
        let style = if page == list.current_page {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            enabled
        };
        spans.push(Span::styled(format!(" {} ", page), style));
    }
    spans.push(Span::styled(
        " Next >",
        if list.has_next() { enabled } else { disabled },
    ));
    Line::from(spans)
}

#[allow(clippy::too_many_arguments)]
fn render_list_screen<'a, R: Resource>(
    f: &mut Frame,
    area: Rect,
    list: &ListController<R>,
    state: &mut TableState,
    searching: bool,
    page_prompt: Option<&str>,
    header: Row<'a>,
    rows: Vec<Row<'a>>,
    widths: &[Constraint],
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    let search_style = if searching {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    };
    let search = Paragraph::new(list.search_query.as_str())
        .style(search_style)
        .block(Block::default().borders(Borders::ALL).title("Search"));
    f.render_widget(search, chunks[0]);

    let title = if list.is_loading {
        format!("{} (loading...)", capitalize(R::PLURAL))
    } else {
        format!(
            "{} (page {} of {})",
            capitalize(R::PLURAL),
            list.current_page,
            list.total_pages.max(1)
        )
    };

    if rows.is_empty() {
        let empty = Paragraph::new(format!("No {} found", R::PLURAL))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(empty, chunks[1]);
    } else {
        let table = Table::new(rows, widths.to_vec())
            .header(header.style(Style::default().add_modifier(Modifier::BOLD)))
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">> ");
        f.render_stateful_widget(table, chunks[1], state);
    }

    f.render_widget(Paragraph::new(pagination_line(list, page_prompt)), chunks[2]);
}

fn render_form_popup<F: EntityForm>(
    f: &mut Frame,
    area: Rect,
    title: String,
    form: &F,
    active: usize,
) {
    let mut lines: Vec<Line> = Vec::new();
    for (i, field) in F::FIELDS.iter().enumerate() {
        let value = form.value(*field);
        let value = if F::is_choice(*field) {
            format!("< {} >", if value.is_empty() { "-" } else { value.as_str() })
        } else {
            value
        };
        let label_style = if i == active {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:>12}: ", F::label(*field)), label_style),
            Span::raw(value),
        ]));
    }

    let height = F::FIELDS.len() as u16 + 2;
    let popup_area = centered_rect_absolute(area.width.min(70), height, area);
    let popup = Paragraph::new(lines).block(
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Green)),
    );
    f.render_widget(Clear, popup_area);
    f.render_widget(popup, popup_area);
}

fn render_confirm_popup(f: &mut Frame, area: Rect, message: String) {
    let popup_area = centered_rect_absolute(area.width.min(50), 5, area);
    let popup = Paragraph::new(vec![
        Line::from(message),
        Line::from(""),
        Line::from("<y> Yes  <n> No"),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .title("Confirm Delete")
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Red)),
    );
    f.render_widget(Clear, popup_area);
    f.render_widget(popup, popup_area);
}

fn render_dialogs<R: Resource>(
    f: &mut Frame,
    area: Rect,
    list: &ListController<R>,
    active: usize,
    describe: impl Fn(&R::Record) -> String,
) {
    let saving = if list.is_saving { " (saving...)" } else { "" };
    match list.dialog {
        Some(Dialog::Create) => render_form_popup(
            f,
            area,
            format!("New {}{}", R::NOUN, saving),
            &list.form,
            active,
        ),
        Some(Dialog::Edit) => render_form_popup(
            f,
            area,
            format!("Edit {}{}", R::NOUN, saving),
            &list.form,
            active,
        ),
        Some(Dialog::Delete) => {
            let name = list.selected.as_ref().map(describe).unwrap_or_default();
            render_confirm_popup(f, area, format!("Delete {} {}?{}", R::NOUN, name, saving));
        }
        None => {}
    }
}

fn render_clients(f: &mut Frame, area: Rect, app: &mut App) {
    let header = Row::new(vec!["Name", "Email", "Phone", "Company", "Status", "Created"]);
    let rows: Vec<Row> = app
        .clients
        .items
        .iter()
        .map(|client| {
            Row::new(vec![
                Cell::from(client.name.clone()),
                Cell::from(client.email.clone()),
                Cell::from(client.phone.clone()),
                Cell::from(client.company.clone()),
                Cell::from(Span::styled(
                    client.status.label().to_string(),
                    Style::default().fg(status_color(&client.status)),
                )),
                Cell::from(format_date(&client.created_at)),
            ])
        })
        .collect();
    let widths = [
        Constraint::Percentage(20),
        Constraint::Percentage(22),
        Constraint::Percentage(14),
        Constraint::Percentage(18),
        Constraint::Percentage(12),
        Constraint::Percentage(14),
    ];

    render_list_screen(
        f,
        area,
        &app.clients,
        &mut app.clients_table,
        app.input_mode == InputMode::Search,
        (app.input_mode == InputMode::GoToPage).then_some(app.page_input.as_str()),
        header,
        rows,
        &widths,
    );
    render_dialogs(f, area, &app.clients, app.form_field, |c| c.name.clone());
}

fn render_deals(f: &mut Frame, area: Rect, app: &mut App) {
    let header = Row::new(vec!["Title", "Client", "Amount", "Stage", "Created"]);
    let rows: Vec<Row> = app
        .deals
        .items
        .iter()
        .map(|deal| {
            Row::new(vec![
                Cell::from(deal.title.clone()),
                Cell::from(deal.client.name.clone()),
                Cell::from(format_amount(deal.amount)),
                Cell::from(Span::styled(
                    deal.stage.label().to_string(),
                    Style::default().fg(stage_color(&deal.stage)),
                )),
                Cell::from(format_date(&deal.created_at)),
            ])
        })
        .collect();
    let widths = [
        Constraint::Percentage(30),
        Constraint::Percentage(22),
        Constraint::Percentage(16),
        Constraint::Percentage(16),
        Constraint::Percentage(16),
    ];

    render_list_screen(
        f,
        area,
        &app.deals,
        &mut app.deals_table,
        app.input_mode == InputMode::Search,
        (app.input_mode == InputMode::GoToPage).then_some(app.page_input.as_str()),
        header,
        rows,
        &widths,
    );
    render_dialogs(f, area, &app.deals, app.form_field, |d| d.title.clone());
}

fn stat_card(title: &'static str, value: String, change: f64, higher_is_better: bool) -> Paragraph<'static> {
    let good = if higher_is_better { change > 0.0 } else { change < 0.0 };
    let change_style = Style::default().fg(if good { Color::Green } else { Color::Red });
    Paragraph::new(vec![
        Line::from(Span::styled(value, Style::default().add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(format_change(change), change_style)),
    ])
    .block(Block::default().borders(Borders::ALL).title(title))
}

fn bar_chart<'a>(title: &'a str, bars: Vec<Bar<'a>>) -> BarChart<'a> {
    BarChart::default()
        .block(Block::default().borders(Borders::ALL).title(title))
        .data(BarGroup::default().bars(&bars))
        .bar_width(7)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan))
}

fn series_bars(points: &[SeriesPoint]) -> Vec<Bar<'_>> {
    points
        .iter()
        .map(|p| {
            Bar::default()
                .value(p.value.max(0.0).round() as u64)
                .label(Line::from(p.date.as_str()))
                .text_value(format_amount(p.value))
        })
        .collect()
}

fn named_bars(values: &[NamedValue]) -> Vec<Bar<'_>> {
    values
        .iter()
        .map(|v| {
            Bar::default()
                .value(v.value.max(0.0).round() as u64)
                .label(Line::from(v.name.as_str()))
        })
        .collect()
}

fn render_dashboard(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(4),
                Constraint::Min(8),
                Constraint::Length(9),
            ]
            .as_ref(),
        )
        .split(area);

    let cards = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(25); 4].as_ref())
        .split(rows[0]);

    match &app.dashboard.summary {
        Some(stats) => {
            f.render_widget(
                stat_card("Total revenue", format_amount(stats.total_revenue), stats.revenue_change, true),
                cards[0],
            );
            f.render_widget(
                stat_card(
                    "Active customers",
                    stats.active_customers.to_string(),
                    stats.customers_change,
                    true,
                ),
                cards[1],
            );
            f.render_widget(
                stat_card(
                    "Conversion",
                    format!("{}%", stats.conversion_rate),
                    stats.conversion_change,
                    true,
                ),
                cards[2],
            );
            f.render_widget(
                stat_card(
                    "Response time",
                    format!("{} h", stats.response_time),
                    stats.response_time_change,
                    false,
                ),
                cards[3],
            );

            let charts = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
                .split(rows[1]);
            f.render_widget(
                bar_chart("Revenue by month", series_bars(&stats.monthly_revenue)),
                charts[0],
            );
            f.render_widget(
                bar_chart("Deals by stage", named_bars(&stats.deals_by_stage)),
                charts[1],
            );
        }
        None => {
            let text = if app.dashboard.is_loading { "Loading..." } else { "No data" };
            for (card, title) in cards.iter().zip([
                "Total revenue",
                "Active customers",
                "Conversion",
                "Response time",
            ]) {
                f.render_widget(
                    Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(title)),
                    *card,
                );
            }
            f.render_widget(
                Paragraph::new(text)
                    .alignment(Alignment::Center)
                    .block(Block::default().borders(Borders::ALL).title("Charts")),
                rows[1],
            );
        }
    }

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(rows[2]);

    let now = Utc::now();
    let activity: Vec<ListItem> = if app.dashboard.activities.is_empty() {
        vec![ListItem::new("No recent activity")]
    } else {
        app.dashboard
            .activities
            .iter()
            .map(|a| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:>3} ", initials(&a.user.name)),
                        Style::default().fg(Color::Cyan),
                    ),
                    Span::raw(format!("{} {} {} ", a.user.name, a.action, a.target)),
                    Span::styled(
                        relative_time(a.created_at, now),
                        Style::default().fg(Color::DarkGray),
                    ),
                ]))
            })
            .collect()
    };
    f.render_widget(
        List::new(activity).block(Block::default().borders(Borders::ALL).title("Recent activity")),
        bottom[0],
    );

    let tasks_block = Block::default().borders(Borders::ALL).title("Upcoming tasks");
    if app.dashboard.tasks.is_empty() {
        f.render_widget(List::new(vec![ListItem::new("No upcoming tasks")]).block(tasks_block), bottom[1]);
    } else {
        let tasks: Vec<Row> = app
            .dashboard
            .tasks
            .iter()
            .map(|task| {
                let mark = if task.completed { "[x]" } else { "[ ]" };
                let title_style = if task.completed {
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::CROSSED_OUT)
                } else {
                    Style::default()
                };
                Row::new(vec![
                    Cell::from(mark),
                    Cell::from(Span::styled(task.title.clone(), title_style)),
                    Cell::from(Span::styled(
                        task.priority.label(),
                        Style::default().fg(priority_color(task.priority)),
                    )),
                    Cell::from(Span::styled(
                        format_date(&task.due_date),
                        Style::default().fg(Color::DarkGray),
                    )),
                ])
            })
            .collect();
        let widths = [
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(6),
            Constraint::Length(10),
        ];
        let table = Table::new(tasks, widths)
            .block(tasks_block)
            .highlight_style(Style::default().fg(Color::Green).add_modifier(Modifier::BOLD))
            .highlight_symbol(">> ");
        f.render_stateful_widget(table, bottom[1], &mut app.task_state);
    }

    if app.input_mode == InputMode::QuickAdd {
        let popup_area = centered_rect_absolute(area.width.min(70), 3, area);
        let input = Paragraph::new(app.quick_add.as_str())
            .style(Style::default().fg(Color::White))
            .block(
                Block::default()
                    .title("New task (Press Enter to Submit)")
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Green)),
            );
        f.render_widget(Clear, popup_area);
        f.render_widget(input, popup_area);
    }
}

fn render_analytics(f: &mut Frame, area: Rect, app: &App) {
    let analytics = &app.analytics;
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(10),
            ]
            .as_ref(),
        )
        .split(area);

    let header = if analytics.is_loading {
        "Loading...".to_string()
    } else {
        format!("Revenue period: {}", analytics.period.label())
    };
    f.render_widget(
        Paragraph::new(header).block(Block::default().borders(Borders::ALL).title("Analytics")),
        rows[0],
    );

    let Some(report) = &analytics.report else {
        f.render_widget(
            Paragraph::new("No data")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL)),
            rows[1],
        );
        return;
    };

    f.render_widget(bar_chart("Revenue", series_bars(analytics.revenue())), rows[1]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage(30),
                Constraint::Percentage(30),
                Constraint::Percentage(40),
            ]
            .as_ref(),
        )
        .split(rows[2]);

    let clients = &report.clients;
    let mut client_lines = vec![
        Line::from(format!("Total: {}", clients.total)),
        Line::from(format!("New: {}", clients.new)),
        Line::from(format!("Active: {}", clients.active)),
        Line::from(format!("Inactive: {}", clients.inactive)),
    ];
    for source in &clients.by_source {
        client_lines.push(Line::from(format!("  {}: {}", source.name, source.value)));
    }
    f.render_widget(
        Paragraph::new(client_lines).block(Block::default().borders(Borders::ALL).title("Clients")),
        bottom[0],
    );

    let deals = &report.deals;
    let deal_lines = vec![
        Line::from(format!("Total: {}", deals.total)),
        Line::from(Span::styled(format!("Won: {}", deals.won), Style::default().fg(Color::Green))),
        Line::from(Span::styled(format!("Lost: {}", deals.lost), Style::default().fg(Color::Red))),
        Line::from(format!("Pending: {}", deals.pending)),
        Line::from(format!("Conversion: {}%", deals.conversion)),
    ];
    f.render_widget(
        Paragraph::new(deal_lines).block(Block::default().borders(Borders::ALL).title("Deals")),
        bottom[1],
    );
    f.render_widget(bar_chart("Deals by stage", named_bars(&deals.by_stage)), bottom[2]);
}

fn auth_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for (i, field) in app.auth_form.fields.iter().enumerate() {
        let value = if field.secret {
            "*".repeat(field.value.chars().count())
        } else {
            field.value.clone()
        };
        let editing = app.input_mode == InputMode::Auth && i == app.auth_form.active;
        let label_style = if editing {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{:>16}: ", field.label), label_style),
            Span::raw(value),
        ]));
    }
    lines.push(Line::from(""));
    if app.session.loading {
        lines.push(Line::from(Span::styled(
            "Please wait...",
            Style::default().fg(Color::DarkGray),
        )));
    }
    if let Some(error) = &app.session.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
    }
    if let Some(success) = &app.session.success {
        lines.push(Line::from(Span::styled(
            success.clone(),
            Style::default().fg(Color::Green),
        )));
    }
    lines
}

fn render_auth_screen(f: &mut Frame, area: Rect, app: &App) {
    let lines = auth_lines(app);
    let height = (lines.len() as u16 + 2).min(area.height);
    let popup_area = centered_rect_absolute(area.width.min(60), height, area);
    let form = Paragraph::new(lines).block(
        Block::default()
            .title(app.route.title())
            .borders(Borders::ALL)
            .style(Style::default().fg(Color::Green)),
    );
    f.render_widget(form, popup_area);
}

fn render_profile(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = Vec::new();
    if let Some(user) = &app.session.user {
        lines.push(Line::from(Span::styled(
            user.display_name(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));
    }
    lines.extend(auth_lines(app));
    lines.push(Line::from(Span::styled(
        "Fill the password fields to change your password; leave them empty to save the profile.",
        Style::default().fg(Color::DarkGray),
    )));
    f.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Profile")),
        area,
    );
}

pub fn render(f: &mut Frame, app: &mut App) {
    let size = f.area();

    // Split the main layout into body and footer
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(size);

    let body_chunk = chunks[0];
    let footer_chunk = chunks[1];

    if app.route.is_public() {
        render_auth_screen(f, body_chunk, app);
    } else {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(22), Constraint::Min(0)].as_ref())
            .split(body_chunk);

        render_sidebar(f, chunks[0], app);
        match app.route {
            Route::Dashboard => render_dashboard(f, chunks[1], app),
            Route::Clients => render_clients(f, chunks[1], app),
            Route::Deals => render_deals(f, chunks[1], app),
            Route::Analytics => render_analytics(f, chunks[1], app),
            Route::Profile => render_profile(f, chunks[1], app),
            _ => {}
        }
    }

    // Render the legend in the footer
    let legend = Paragraph::new(get_legend(app))
        .style(Style::default().fg(Color::White))
        .alignment(Alignment::Left)
        .wrap(Wrap { trim: true });

    f.render_widget(legend, footer_chunk);
}

pub fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    events: &mut UnboundedReceiver<AppEvent>,
) -> io::Result<()> {
    loop {
        // Apply whatever the backend finished since the last frame
        while let Ok(event) = events.try_recv() {
            app.apply(event);
        }

        terminal.draw(|f| render(f, &mut app))?;

        // Handle input
        if event::poll(Duration::from_millis(100))? {
            if let CEvent::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                let should_quit = app.handle_input(key)?;
                if should_quit {
                    return Ok(());
                }
            }
        }
    }
}
