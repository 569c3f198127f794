//! Watermark motion path.
//!
//! The mark travels a four-phase loop around the frame:
//!
//! | phase | motion                                   |
//! |-------|------------------------------------------|
//! | 0     | left → right along the top edge          |
//! | 1     | held at the right edge, top → bottom     |
//! | 2     | right → left along the bottom edge       |
//! | 3     | held at the left edge, bottom → top      |
//!
//! with a small sinusoidal jitter on both axes. [`Trajectory::position`] is
//! the reference math; [`Trajectory::x_expr`] / [`Trajectory::y_expr`]
//! build the same function as an [`Expr`] tree that FFmpeg evaluates per
//! frame.

use std::f64::consts::TAU;
use std::fmt;

/// Number of phases in one loop.
pub const PHASE_COUNT: u32 = 4;
/// Default seconds per phase.
pub const DEFAULT_SEGMENT_SECS: f64 = 5.0;
/// Jitter period on the x axis (seconds).
pub const JITTER_PERIOD_X: f64 = 4.8;
/// Jitter period on the y axis (seconds).
pub const JITTER_PERIOD_Y: f64 = 3.7;

/// Position of the overlay's top-left corner over time.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    /// x when hugging the left edge
    pub left: f64,
    /// x when hugging the right edge
    pub right: f64,
    /// y when hugging the top edge
    pub top: f64,
    /// y when hugging the bottom edge
    pub bottom: f64,
    /// Seconds per phase
    pub segment_secs: f64,
    /// Jitter amplitude in pixels
    pub jitter: f64,
    pub jitter_period_x: f64,
    pub jitter_period_y: f64,
}

impl Trajectory {
    /// Full loop duration in seconds.
    pub fn cycle_secs(&self) -> f64 {
        self.segment_secs * PHASE_COUNT as f64
    }

    /// Phase index and progress within the phase (0..1) at time `t`.
    pub fn phase_at(&self, t: f64) -> (u32, f64) {
        let segment = (t / self.segment_secs).floor();
        let phase = segment.rem_euclid(PHASE_COUNT as f64) as u32;
        let progress = (t - self.segment_secs * segment) / self.segment_secs;
        (phase, progress)
    }

    /// Position for a phase, progress within it, and absolute time.
    pub fn position(&self, phase: u32, progress: f64, t: f64) -> (f64, f64) {
        let p = progress.clamp(0.0, 1.0);
        let (x, y) = match phase % PHASE_COUNT {
            0 => (lerp(self.left, self.right, p), self.top),
            1 => (self.right, lerp(self.top, self.bottom, p)),
            2 => (lerp(self.right, self.left, p), self.bottom),
            _ => (self.left, lerp(self.bottom, self.top, p)),
        };

        (
            x + self.jitter * (TAU * t / self.jitter_period_x).sin(),
            y + self.jitter * (TAU * t / self.jitter_period_y).sin(),
        )
    }

    /// Position at time `t`.
    pub fn position_at(&self, t: f64) -> (f64, f64) {
        let (phase, progress) = self.phase_at(t);
        self.position(phase, progress, t)
    }

    /// Per-frame x expression.
    pub fn x_expr(&self) -> Expr {
        let phases = [
            lerp_expr(self.left, self.right, self.progress_expr()),
            Expr::Num(self.right),
            lerp_expr(self.right, self.left, self.progress_expr()),
            Expr::Num(self.left),
        ];
        self.select_phase(phases)
            .add(jitter_expr(self.jitter, self.jitter_period_x))
    }

    /// Per-frame y expression.
    pub fn y_expr(&self) -> Expr {
        let phases = [
            Expr::Num(self.top),
            lerp_expr(self.top, self.bottom, self.progress_expr()),
            Expr::Num(self.bottom),
            lerp_expr(self.bottom, self.top, self.progress_expr()),
        ];
        self.select_phase(phases)
            .add(jitter_expr(self.jitter, self.jitter_period_y))
    }

    /// `mod(floor(t/segment), 4)`
    fn phase_expr(&self) -> Expr {
        Expr::Time
            .div(Expr::Num(self.segment_secs))
            .floor()
            .modulo(Expr::Num(PHASE_COUNT as f64))
    }

    /// `mod(t, segment) / segment`
    fn progress_expr(&self) -> Expr {
        Expr::Time
            .modulo(Expr::Num(self.segment_secs))
            .div(Expr::Num(self.segment_secs))
    }

    /// Nested `if(eq(phase,0), a, if(eq(phase,1), b, if(eq(phase,2), c, d)))`.
    fn select_phase(&self, phases: [Expr; 4]) -> Expr {
        let [p0, p1, p2, p3] = phases;
        let branch = |index: f64, then: Expr, otherwise: Expr| {
            Expr::If(
                Box::new(Expr::Eq(
                    Box::new(self.phase_expr()),
                    Box::new(Expr::Num(index)),
                )),
                Box::new(then),
                Box::new(otherwise),
            )
        };
        branch(0.0, p0, branch(1.0, p1, branch(2.0, p2, p3)))
    }
}

fn lerp(from: f64, to: f64, p: f64) -> f64 {
    from + (to - from) * p
}

fn lerp_expr(from: f64, to: f64, progress: Expr) -> Expr {
    Expr::Num(from).add(Expr::Num(to - from).mul(progress))
}

fn jitter_expr(amplitude: f64, period: f64) -> Expr {
    Expr::Num(amplitude).mul(Expr::Sin(Box::new(Expr::Num(TAU / period).mul(Expr::Time))))
}

/// Arithmetic expression over the frame time `t`.
///
/// `Display` renders FFmpeg expression syntax; [`Expr::eval`] follows
/// FFmpeg's semantics so the two can be checked against each other.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Num(f64),
    /// Frame timestamp in seconds
    Time,
    Add(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Mod(Box<Expr>, Box<Expr>),
    Floor(Box<Expr>),
    Sin(Box<Expr>),
    /// 1 when equal, else 0
    Eq(Box<Expr>, Box<Expr>),
    /// if(cond, then, else); cond is true when non-zero
    If(Box<Expr>, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn add(self, rhs: Expr) -> Expr {
        Expr::Add(Box::new(self), Box::new(rhs))
    }

    pub fn mul(self, rhs: Expr) -> Expr {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }

    pub fn div(self, rhs: Expr) -> Expr {
        Expr::Div(Box::new(self), Box::new(rhs))
    }

    pub fn modulo(self, rhs: Expr) -> Expr {
        Expr::Mod(Box::new(self), Box::new(rhs))
    }

    pub fn floor(self) -> Expr {
        Expr::Floor(Box::new(self))
    }

    /// Evaluate at time `t`.
    pub fn eval(&self, t: f64) -> f64 {
        match self {
            Expr::Num(v) => *v,
            Expr::Time => t,
            Expr::Add(a, b) => a.eval(t) + b.eval(t),
            Expr::Mul(a, b) => a.eval(t) * b.eval(t),
            Expr::Div(a, b) => a.eval(t) / b.eval(t),
            Expr::Mod(a, b) => {
                let (a, b) = (a.eval(t), b.eval(t));
                a - b * (a / b).floor()
            }
            Expr::Floor(a) => a.eval(t).floor(),
            Expr::Sin(a) => a.eval(t).sin(),
            Expr::Eq(a, b) => {
                if a.eval(t) == b.eval(t) {
                    1.0
                } else {
                    0.0
                }
            }
            Expr::If(cond, then, otherwise) => {
                if cond.eval(t) != 0.0 {
                    then.eval(t)
                } else {
                    otherwise.eval(t)
                }
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Num(v) if *v < 0.0 => write!(f, "({})", format_num(*v)),
            Expr::Num(v) => f.write_str(&format_num(*v)),
            Expr::Time => f.write_str("t"),
            Expr::Add(a, b) => write!(f, "({}+{})", a, b),
            Expr::Mul(a, b) => write!(f, "({}*{})", a, b),
            Expr::Div(a, b) => write!(f, "({}/{})", a, b),
            Expr::Mod(a, b) => write!(f, "mod({},{})", a, b),
            Expr::Floor(a) => write!(f, "floor({})", a),
            Expr::Sin(a) => write!(f, "sin({})", a),
            Expr::Eq(a, b) => write!(f, "eq({},{})", a, b),
            Expr::If(c, a, b) => write!(f, "if({},{},{})", c, a, b),
        }
    }
}

/// Fixed six-decimal rendering, trailing zeros trimmed.
fn format_num(v: f64) -> String {
    let s = format!("{:.6}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s.is_empty() || s == "-" {
        "0".to_string()
    } else {
        s.to_string()
    }
}
