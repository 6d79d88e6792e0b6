use std::{cell::RefCell, io, rc::Rc};

use message_idle::economy::state::{
    GeneratorId, GeneratorUpgrade, GlobalUpgrade, ResearchBranch,
};
use message_idle::economy::Economy;
use message_idle::{Action, EngineConfig, MemoryStorage, Storage, CONFIG_KEY};
use ratzilla::event::KeyCode;
use ratzilla::ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratzilla::ratatui::style::{Color, Modifier, Style};
use ratzilla::ratatui::text::{Line, Span};
use ratzilla::ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratzilla::ratatui::{Frame, Terminal};
use ratzilla::{DomBackend, WebRenderer};

type HostEconomy = Economy<Box<dyn Storage>>;

struct Host {
    economy: HostEconomy,
    /// Generator whose panel the unit/upgrade keys act on.
    selected: GeneratorId,
    status: String,
}

#[cfg(target_arch = "wasm32")]
fn open_storage() -> Box<dyn Storage> {
    match message_idle::economy::save::LocalStorage::open() {
        Some(storage) => Box::new(storage),
        None => {
            tracing::warn!("localStorage unavailable; progress will not persist");
            Box::new(MemoryStorage::new())
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn open_storage() -> Box<dyn Storage> {
    Box::new(MemoryStorage::new())
}

fn now_ms() -> f64 {
    web_sys::window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or_else(js_sys::Date::now)
}

fn load_economy() -> HostEconomy {
    let storage = open_storage();
    let config = EngineConfig::from_storage(&storage, CONFIG_KEY);
    Economy::load_or_default(storage, config)
}

/// Send engine logs to the browser console. Native runs keep the default
/// no-op dispatcher.
fn install_logging() {
    #[cfg(target_arch = "wasm32")]
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::INFO)
            .set_report_logs_in_timings(false)
            .build(),
    );
}

fn main() -> io::Result<()> {
    console_error_panic_hook::set_once();
    install_logging();

    let host = Rc::new(RefCell::new(Host {
        economy: load_economy(),
        selected: GeneratorId::Bot,
        status: String::new(),
    }));
    let backend = DomBackend::new()?;
    let mut terminal = Terminal::new(backend)?;

    terminal.on_key_event({
        let host = host.clone();
        move |key_event| {
            let mut host = host.borrow_mut();
            match key_event.code {
                KeyCode::Left | KeyCode::Char('[') => select(&mut host, false),
                KeyCode::Right | KeyCode::Char(']') => select(&mut host, true),
                KeyCode::Char(c) => handle_char(&mut host, c),
                _ => {}
            }
        }
    });

    terminal.draw_web(move |f| {
        let now = now_ms();
        let mut host = host.borrow_mut();
        host.economy.frame(now);
        render(f, &mut host, now);
    });

    Ok(())
}

/// Move the selection and give a still-locked tier its preview name.
fn select(host: &mut Host, forward: bool) {
    let all = GeneratorId::all();
    let idx = host.selected.index();
    let next = if forward {
        (idx + 1) % all.len()
    } else {
        (idx + all.len() - 1) % all.len()
    };
    host.selected = all[next];
    host.economy.apply(Action::Preview(host.selected));
}

fn action_for_key(host: &Host, c: char) -> Option<Action> {
    let id = host.selected;
    let action = match c {
        ' ' | 'm' => Action::Generate,
        'u' => Action::Unlock(id),
        'b' => Action::BuyUnit(id),
        'e' => Action::Upgrade(id, GeneratorUpgrade::Efficiency),
        's' => Action::Upgrade(id, GeneratorUpgrade::Speed),
        'c' => Action::Upgrade(id, GeneratorUpgrade::CascadeEfficiency),
        'd' => Action::Upgrade(id, GeneratorUpgrade::AutoBuyDelay),
        'a' if host.economy.state().generator(id).auto_buy_purchased => Action::ToggleAutoBuy(id),
        'a' => Action::BuyAutoBuy(id),
        'p' => Action::Prestige(id),
        '1' => Action::BuyGlobal(GlobalUpgrade::AutoBoost),
        '2' => Action::BuyGlobal(GlobalUpgrade::MessageMultiplier),
        '3' => Action::BuyGlobal(GlobalUpgrade::CostEfficiency),
        '4' => Action::BuyGlobal(GlobalUpgrade::ManualPower),
        'x' => Action::BuyResearchBoost,
        'h' => Action::UpgradeResearch(ResearchBranch::Manual),
        'j' => Action::UpgradeResearch(ResearchBranch::Bot),
        'k' => Action::UpgradeResearch(ResearchBranch::Cascade),
        _ => return None,
    };
    Some(action)
}

fn handle_char(host: &mut Host, c: char) {
    match c {
        'f' => {
            let mode = host.economy.cycle_number_mode();
            host.status = format!("Number format: {mode:?}");
        }
        'R' => {
            host.economy.reset();
            host.status = "Economy reset".into();
        }
        'E' => match host.economy.export() {
            Ok(text) => {
                web_sys::console::log_1(&text.into());
                host.status = "Save exported to the browser console".into();
            }
            Err(e) => host.status = format!("Export failed: {e}"),
        },
        _ => {
            let Some(action) = action_for_key(host, c) else {
                return;
            };
            if action == Action::Generate {
                host.economy.generate_manually(now_ms());
                return;
            }
            host.status = if host.economy.apply(action) {
                String::new()
            } else {
                "Not available".into()
            };
        }
    }
}

fn render(f: &mut Frame, host: &mut Host, now: f64) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(f.area());

    render_header(f, host, chunks[0], now);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);
    render_generators(f, host, columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(6)])
        .split(columns[1]);
    render_globals(f, host, right[0]);
    render_research(f, host, right[1]);

    render_help(f, host, chunks[2]);
}

fn render_header(f: &mut Frame, host: &mut Host, area: Rect, now: f64) {
    let eco = &mut host.economy;
    let manual = eco.manual_rate(now);
    let balance = eco.format(eco.messages().total());
    let production = eco.format(eco.total_production());
    let manual = eco.format(manual);
    let playtime_s = (eco.state().playtime_ms / 1000.0) as u64;
    let lines = vec![
        Line::from(vec![
            Span::styled(
                format!("✉ {balance} messages"),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!("   {production}/s auto, {manual}/s typed")),
        ]),
        Line::from(Span::styled(
            format!(
                "played {}:{:02}:{:02}   lifetime {}",
                playtime_s / 3600,
                (playtime_s / 60) % 60,
                playtime_s % 60,
                eco.format(eco.messages().lifetime as f64)
            ),
            Style::default().fg(Color::DarkGray),
        )),
    ];
    let header = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" message-idle "),
    );
    f.render_widget(header, area);
}

fn affordable_style(ok: bool) -> Style {
    if ok {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn render_generators(f: &mut Frame, host: &Host, area: Rect) {
    let eco = &host.economy;
    let mut lines = Vec::new();
    for &id in GeneratorId::all() {
        let view = eco.generator_view(id);
        let marker = if id == host.selected { "▶ " } else { "  " };
        let title_style = if id == host.selected {
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::White)
        };
        lines.push(Line::from(Span::styled(
            format!("{marker}{} ({})", view.name, id.label()),
            title_style,
        )));

        if !view.unlocked {
            lines.push(Line::from(Span::styled(
                format!("    [U] unlock for {}", eco.format(view.unlock_cost)),
                affordable_style(view.can_unlock),
            )));
            continue;
        }

        if id.produces() {
            lines.push(Line::from(format!(
                "    {} {} / {}   {}/s",
                view.units,
                id.unit_name(),
                view.max_units,
                eco.format(view.production)
            )));
            if let Some(cost) = view.next_unit_cost {
                lines.push(Line::from(Span::styled(
                    format!("    [B] buy one for {}", eco.format(cost)),
                    affordable_style(view.can_buy_unit),
                )));
            }
            for upgrade in &view.upgrades {
                let key = match upgrade.upgrade {
                    GeneratorUpgrade::Efficiency => 'E',
                    GeneratorUpgrade::Speed => 'S',
                    GeneratorUpgrade::CascadeEfficiency => 'C',
                    GeneratorUpgrade::AutoBuyDelay => 'D',
                };
                let cost = upgrade
                    .cost
                    .map(|c| eco.format(c))
                    .unwrap_or_else(|| "max".into());
                lines.push(Line::from(Span::styled(
                    format!(
                        "    [{key}] {} {}/{}  {cost}",
                        upgrade.upgrade.name(),
                        upgrade.level,
                        upgrade.max_level
                    ),
                    affordable_style(upgrade.affordable),
                )));
            }
            let auto = match (view.auto_buy_purchased, view.auto_buy_cost) {
                (true, _) => Span::raw(format!(
                    "    [A] auto-buy {}{}",
                    if view.auto_buy { "on" } else { "off" },
                    view.auto_buy_remaining_ms
                        .map(|ms| format!(" ({:.1}s)", ms / 1000.0))
                        .unwrap_or_default()
                )),
                (false, Some(cost)) => Span::styled(
                    format!("    [A] auto-buy for {}", eco.format(cost)),
                    affordable_style(view.can_buy_auto_buy),
                ),
                (false, None) => Span::raw(""),
            };
            lines.push(Line::from(auto));
            if let Some(cost) = view.prestige_cost {
                lines.push(Line::from(Span::styled(
                    format!(
                        "    [P] prestige {} for {}",
                        view.prestige_level + 1,
                        eco.format(cost)
                    ),
                    affordable_style(view.can_prestige),
                )));
            }
        } else {
            lines.push(Line::from(format!(
                "    {} research points",
                eco.research_view().points
            )));
        }
    }

    let panel = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green))
                .title(" Generators "),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(panel, area);
}

fn render_globals(f: &mut Frame, host: &Host, area: Rect) {
    let eco = &host.economy;
    let lines: Vec<Line> = GlobalUpgrade::all()
        .iter()
        .enumerate()
        .map(|(i, &kind)| {
            let view = eco.global_upgrade_view(kind);
            let cost = view
                .cost
                .map(|c| eco.format(c))
                .unwrap_or_else(|| "max".into());
            Line::from(Span::styled(
                format!(
                    "[{}] {} {}/{}  {cost}",
                    i + 1,
                    kind.name(),
                    view.level,
                    view.max_level
                ),
                affordable_style(view.affordable),
            ))
        })
        .collect();
    let panel = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta))
            .title(" Upgrades "),
    );
    f.render_widget(panel, area);
}

fn render_research(f: &mut Frame, host: &Host, area: Rect) {
    let eco = &host.economy;
    let view = eco.research_view();
    let mut lines = Vec::new();
    if !view.unlocked {
        lines.push(Line::from(Span::styled(
            "Unlock the research tier first",
            Style::default().fg(Color::DarkGray),
        )));
    } else if !view.global_boost {
        lines.push(Line::from(Span::styled(
            format!(
                "[X] global boost for {} ({} pts)",
                eco.format(view.boost_cost),
                view.points
            ),
            affordable_style(view.can_buy_boost),
        )));
    } else {
        for (branch, key) in view.branches.iter().zip(['H', 'J', 'K']) {
            let cost = branch
                .cost_points
                .map(|p| format!("{p} pts"))
                .unwrap_or_else(|| "max".into());
            lines.push(Line::from(Span::styled(
                format!(
                    "[{key}] {} {}/{}  ×{:.2}  {cost}",
                    branch.branch.name(),
                    branch.level,
                    branch.max_level,
                    branch.multiplier
                ),
                affordable_style(branch.affordable),
            )));
        }
    }
    let panel = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue))
                .title(" Research "),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(panel, area);
}

fn render_help(f: &mut Frame, host: &Host, area: Rect) {
    let text = if host.status.is_empty() {
        "[Space] type  [←/→] select  [F] format  [Shift+E] export  [Shift+R] reset".to_string()
    } else {
        host.status.clone()
    };
    let help = Paragraph::new(Line::from(Span::styled(
        text,
        Style::default().fg(Color::DarkGray),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    )
    .alignment(Alignment::Center);
    f.render_widget(help, area);
}
