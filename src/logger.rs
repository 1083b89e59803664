//! Log output stamped with simulation time.
//!
//! Components log through the plain `tracing` macros. [`SimFormat`] renders
//! those records with the current [`SimTime`] in front, and [`init`] installs
//! it globally, filtered by `RUST_LOG`.

use crate::time::SimTime;
use nu_ansi_term::{Color, Style};
use std::fmt::{self, Display, Write as _};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::{
    filter::Directive,
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields, FormattedFields},
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Applies when `RUST_LOG` is unset.
pub const FALLBACK_LOG_LEVEL: Level = Level::INFO;

/// Installs a global subscriber using [`SimFormat`].
///
/// Returns `false` if some subscriber was already installed.
pub fn init() -> bool {
    init_with_level(FALLBACK_LOG_LEVEL)
}

/// Same as [`init`], with `level` replacing [`FALLBACK_LOG_LEVEL`].
pub fn init_with_level(level: Level) -> bool {
    let filter = EnvFilter::builder()
        .with_default_directive(Directive::from(level))
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .event_format(format())
        .finish()
        .try_init()
        .is_ok()
}

/// Creates the formatter, for use with a custom subscriber.
#[must_use]
pub fn format() -> SimFormat {
    SimFormat { _priv: () }
}

/// Renders records as `[ <simtime> ] LEVEL span{fields}: target: message fields`.
#[derive(Debug)]
pub struct SimFormat {
    _priv: (),
}

fn level_color(level: Level) -> Color {
    match level {
        Level::ERROR => Color::Red,
        Level::WARN => Color::Yellow,
        Level::INFO => Color::Green,
        Level::DEBUG => Color::Purple,
        Level::TRACE => Color::Cyan,
    }
}

/// Writes styled text, dropping the escapes for plain writers.
struct Painter {
    ansi: bool,
}

impl Painter {
    fn paint(&self, w: &mut Writer<'_>, style: Style, text: impl Display) -> fmt::Result {
        if self.ansi {
            write!(w, "{}{text}{}", style.prefix(), style.suffix())
        } else {
            write!(w, "{text}")
        }
    }
}

impl<S, N> FormatEvent<S, N> for SimFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut w: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let painter = Painter {
            ansi: w.has_ansi_escapes(),
        };
        let meta = event.metadata();
        let faint = Style::new().dimmed();

        painter.paint(&mut w, faint, format_args!("[ {} ] ", SimTime::now()))?;
        painter.paint(
            &mut w,
            level_color(*meta.level()).normal(),
            format_args!("{} ", meta.level()),
        )?;

        let spans = ctx.event_scope().into_iter().flat_map(|s| s.from_root());
        let mut any_span = false;
        for span in spans {
            any_span = true;
            let strong = Style::new().bold();
            painter.paint(&mut w, strong, span.name())?;

            let extensions = span.extensions();
            let fields = extensions
                .get::<FormattedFields<N>>()
                .filter(|fields| !fields.is_empty());
            if let Some(fields) = fields {
                painter.paint(&mut w, strong, "{")?;
                write!(w, "{fields}")?;
                painter.paint(&mut w, strong, "}")?;
            }
            painter.paint(&mut w, faint, ":")?;
        }
        if any_span {
            w.write_str(" ")?;
        }

        painter.paint(&mut w, faint, format_args!("{}: ", meta.target()))?;
        ctx.format_fields(w.by_ref(), event)?;
        writeln!(w)
    }
}
