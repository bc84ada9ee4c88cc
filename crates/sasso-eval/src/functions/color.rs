//! `sass:color` and the global color helpers (`rgb()`, `lighten()`, ...).

use super::Args;
use crate::error::{EvalError, EvalResult};
use crate::format::ValueFormatter;
use crate::value::{Color, ListSeparator, SassNumber, Value};

pub fn call(name: &str, args: &Args) -> EvalResult<Value> {
    match name {
        "rgb" | "rgba" => rgb(args),
        "hsl" | "hsla" => hsl(args),
        "red" => channel_of(args, |c| Value::number(c.red.round())),
        "green" => channel_of(args, |c| Value::number(c.green.round())),
        "blue" => channel_of(args, |c| Value::number(c.blue.round())),
        "alpha" => channel_of(args, |c| Value::number(c.alpha)),
        "hue" => channel_of(args, |c| Value::with_unit(c.to_hsl().0, "deg")),
        "saturation" => channel_of(args, |c| Value::with_unit(c.to_hsl().1, "%")),
        "lightness" => channel_of(args, |c| Value::with_unit(c.to_hsl().2, "%")),
        "mix" => {
            args.check_max(3)?;
            let first = args.color(0, "color1")?;
            let second = args.color(1, "color2")?;
            let weight = match args.opt_number(2, "weight")? {
                Some(w) => percent(w, "weight")?,
                None => 50.0,
            };
            Ok(Value::Color(mix(&first, &second, weight / 100.0)))
        }
        "adjust" => adjust(args),
        "scale" => scale(args),
        "change" => change(args),
        "invert" => {
            args.check_max(2)?;
            let color = args.color(0, "color")?;
            let weight = match args.opt_number(1, "weight")? {
                Some(w) => percent(w, "weight")?,
                None => 100.0,
            };
            let inverted = Color::rgba(
                255.0 - color.red,
                255.0 - color.green,
                255.0 - color.blue,
                color.alpha,
            );
            Ok(Value::Color(mix(&inverted, &color, weight / 100.0)))
        }
        "grayscale" => {
            args.check_max(1)?;
            let color = args.color(0, "color")?;
            Ok(Value::Color(with_hsl(&color, |h, _, l| (h, 0.0, l))))
        }
        "complement" => {
            args.check_max(1)?;
            let color = args.color(0, "color")?;
            Ok(Value::Color(with_hsl(&color, |h, s, l| (h + 180.0, s, l))))
        }
        "ie-hex-str" => {
            args.check_max(1)?;
            Ok(Value::unquoted(args.color(0, "color")?.to_ie_hex()))
        }
        "lighten" => hsl_shift(args, |(h, s, l), amount| (h, s, l + amount)),
        "darken" => hsl_shift(args, |(h, s, l), amount| (h, s, l - amount)),
        "saturate" => hsl_shift(args, |(h, s, l), amount| (h, s + amount, l)),
        "desaturate" => hsl_shift(args, |(h, s, l), amount| (h, s - amount, l)),
        "adjust-hue" => {
            args.check_max(2)?;
            let color = args.color(0, "color")?;
            let degrees = args.number(1, "degrees")?.value;
            Ok(Value::Color(with_hsl(&color, |h, s, l| (h + degrees, s, l))))
        }
        "opacify" => alpha_shift(args, 1.0),
        "transparentize" => alpha_shift(args, -1.0),
        _ => Err(EvalError::UndefinedFunction(format!("color.{name}"))),
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Constructors
// ══════════════════════════════════════════════════════════════════════════════

/// `rgb($red, $green, $blue, $alpha?)`, `rgb($color, $alpha)` or
/// `rgb($red $green $blue / $alpha)`.
fn rgb(args: &Args) -> EvalResult<Value> {
    args.check_max(4)?;
    if let [Value::List(list)] = args.positional.as_slice() {
        let (channels, alpha) = split_slash_alpha(list.items.clone(), list.separator);
        return rgb_from(&channels, alpha.as_ref());
    }
    if let Some(Value::Color(color)) = args.get(0, "color") {
        if args.len() == 2 {
            let alpha = args.number(1, "alpha")?;
            return Ok(Value::Color(color.with_alpha(unit_interval(alpha))));
        }
    }
    let mut channels = Vec::new();
    for (i, name) in ["red", "green", "blue"].iter().enumerate() {
        channels.push(args.required(i, name)?.clone());
    }
    let alpha = args.get(3, "alpha").cloned();
    rgb_from(&channels, alpha.as_ref())
}

fn rgb_from(channels: &[Value], alpha: Option<&Value>) -> EvalResult<Value> {
    let [r, g, b] = channels else {
        return Err(EvalError::WrongArgCount(
            "Missing element $blue.".to_string(),
        ));
    };
    let channel = |v: &Value, name: &str| -> EvalResult<f64> {
        let n = expect_number(v, name)?;
        Ok(if n.unit_str() == "%" {
            n.value / 100.0 * 255.0
        } else {
            n.value
        })
    };
    let alpha = match alpha {
        Some(v) => unit_interval(expect_number(v, "alpha")?),
        None => 1.0,
    };
    Ok(Value::Color(Color::rgba(
        channel(r, "red")?,
        channel(g, "green")?,
        channel(b, "blue")?,
        alpha,
    )))
}

/// `hsl($hue, $saturation, $lightness, $alpha?)`.
fn hsl(args: &Args) -> EvalResult<Value> {
    args.check_max(4)?;
    let (channels, alpha) = match args.positional.as_slice() {
        [Value::List(list)] => split_slash_alpha(list.items.clone(), list.separator),
        _ => {
            let mut channels = Vec::new();
            for (i, name) in ["hue", "saturation", "lightness"].iter().enumerate() {
                channels.push(args.required(i, name)?.clone());
            }
            (channels, args.get(3, "alpha").cloned())
        }
    };
    let [h, s, l] = channels.as_slice() else {
        return Err(EvalError::WrongArgCount(
            "Missing element $lightness.".to_string(),
        ));
    };
    let hue = expect_number(h, "hue")?;
    let hue = hue.value_in("deg").unwrap_or(hue.value);
    let alpha = match &alpha {
        Some(v) => unit_interval(expect_number(v, "alpha")?),
        None => 1.0,
    };
    Ok(Value::Color(Color::from_hsla(
        hue,
        expect_number(s, "saturation")?.value,
        expect_number(l, "lightness")?.value,
        alpha,
    )))
}

/// Split `r g b / a` into channels and alpha.
fn split_slash_alpha(items: Vec<Value>, separator: ListSeparator) -> (Vec<Value>, Option<Value>) {
    if separator == ListSeparator::Slash && items.len() == 2 {
        let mut items = items;
        let alpha = items.pop();
        let channels = items.pop().map(|c| c.to_items()).unwrap_or_default();
        return (channels, alpha);
    }
    let mut channels = items;
    if let Some(Value::Number(n)) = channels.last() {
        if let Some(slash) = &n.as_slash {
            let (blue, alpha) = (slash.0.clone(), slash.1.clone());
            channels.pop();
            channels.push(Value::Number(blue));
            return (channels, Some(Value::Number(alpha)));
        }
    }
    (channels, None)
}

// ══════════════════════════════════════════════════════════════════════════════
// Adjustments
// ══════════════════════════════════════════════════════════════════════════════

fn channel_of(args: &Args, read: impl Fn(&Color) -> Value) -> EvalResult<Value> {
    args.check_max(1)?;
    Ok(read(&args.color(0, "color")?))
}

fn hsl_shift(args: &Args, shift: fn((f64, f64, f64), f64) -> (f64, f64, f64)) -> EvalResult<Value> {
    args.check_max(2)?;
    let color = args.color(0, "color")?;
    let amount = percent(args.number(1, "amount")?, "amount")?;
    Ok(Value::Color(with_hsl(&color, |h, s, l| {
        shift((h, s, l), amount)
    })))
}

fn alpha_shift(args: &Args, sign: f64) -> EvalResult<Value> {
    args.check_max(2)?;
    let color = args.color(0, "color")?;
    let amount = args.number(1, "amount")?;
    Ok(Value::Color(color.with_alpha(color.alpha + sign * unit_interval(amount))))
}

/// `color.adjust($color, $red: ..., $lightness: ..., ...)`.
fn adjust(args: &Args) -> EvalResult<Value> {
    let color = args.color(0, "color")?;
    if args.positional.len() > 1 {
        return Err(EvalError::WrongArgCount(
            "Only one positional argument is allowed. All other arguments must be passed by name."
                .to_string(),
        ));
    }
    let delta = |name: &str| -> EvalResult<Option<f64>> {
        match args.keyword(name) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => Ok(Some(expect_number(v, name)?.value)),
        }
    };
    let mut result = color.clone();
    let (dr, dg, db) = (delta("red")?, delta("green")?, delta("blue")?);
    if dr.is_some() || dg.is_some() || db.is_some() {
        result = Color::rgba(
            color.red + dr.unwrap_or(0.0),
            color.green + dg.unwrap_or(0.0),
            color.blue + db.unwrap_or(0.0),
            color.alpha,
        );
    }
    let (dh, ds, dl) = (delta("hue")?, delta("saturation")?, delta("lightness")?);
    if dh.is_some() || ds.is_some() || dl.is_some() {
        result = with_hsl(&result, |h, s, l| {
            (
                h + dh.unwrap_or(0.0),
                s + ds.unwrap_or(0.0),
                l + dl.unwrap_or(0.0),
            )
        });
    }
    if let Some(da) = delta("alpha")? {
        result = result.with_alpha(result.alpha + da);
    }
    Ok(Value::Color(result))
}

/// `color.scale(...)`: each keyword is a percentage of the remaining room.
fn scale(args: &Args) -> EvalResult<Value> {
    let color = args.color(0, "color")?;
    let factor = |name: &str| -> EvalResult<Option<f64>> {
        match args.keyword(name) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => {
                let n = expect_number(v, name)?;
                if n.unit_str() != "%" {
                    return Err(EvalError::InvalidArgument(format!(
                        "${name}: Expected {} to have unit \"%\".",
                        ValueFormatter::inspect(v)
                    )));
                }
                Ok(Some(n.value / 100.0))
            }
        }
    };
    let scaled = |current: f64, max: f64, by: Option<f64>| match by {
        None => current,
        Some(f) if f > 0.0 => current + (max - current) * f,
        Some(f) => current + current * f,
    };
    let mut result = color.clone();
    let (fr, fg, fb) = (factor("red")?, factor("green")?, factor("blue")?);
    if fr.is_some() || fg.is_some() || fb.is_some() {
        result = Color::rgba(
            scaled(color.red, 255.0, fr),
            scaled(color.green, 255.0, fg),
            scaled(color.blue, 255.0, fb),
            color.alpha,
        );
    }
    let (fs, fl) = (factor("saturation")?, factor("lightness")?);
    if fs.is_some() || fl.is_some() {
        result = with_hsl(&result, |h, s, l| (h, scaled(s, 100.0, fs), scaled(l, 100.0, fl)));
    }
    if let Some(fa) = factor("alpha")? {
        result = result.with_alpha(scaled(result.alpha, 1.0, Some(fa)));
    }
    Ok(Value::Color(result))
}

/// `color.change(...)`: keywords replace channels outright.
fn change(args: &Args) -> EvalResult<Value> {
    let color = args.color(0, "color")?;
    let set = |name: &str| -> EvalResult<Option<f64>> {
        match args.keyword(name) {
            None | Some(Value::Null) => Ok(None),
            Some(v) => Ok(Some(expect_number(v, name)?.value)),
        }
    };
    let mut result = color.clone();
    let (r, g, b) = (set("red")?, set("green")?, set("blue")?);
    if r.is_some() || g.is_some() || b.is_some() {
        result = Color::rgba(
            r.unwrap_or(color.red),
            g.unwrap_or(color.green),
            b.unwrap_or(color.blue),
            color.alpha,
        );
    }
    let (h, s, l) = (set("hue")?, set("saturation")?, set("lightness")?);
    if h.is_some() || s.is_some() || l.is_some() {
        result = with_hsl(&result, |ch, cs, cl| {
            (h.unwrap_or(ch), s.unwrap_or(cs), l.unwrap_or(cl))
        });
    }
    if let Some(a) = set("alpha")? {
        result = result.with_alpha(a);
    }
    Ok(Value::Color(result))
}

/// Rebuild a color through HSL, keeping alpha.
fn with_hsl(color: &Color, f: impl Fn(f64, f64, f64) -> (f64, f64, f64)) -> Color {
    let (h, s, l) = color.to_hsl();
    let (h, s, l) = f(h, s, l);
    Color::from_hsla(h, s.clamp(0.0, 100.0), l.clamp(0.0, 100.0), color.alpha)
}

/// Weighted mix of two colors; `weight` is the share of `first` (0-1).
pub fn mix(first: &Color, second: &Color, weight: f64) -> Color {
    let w = 2.0 * weight - 1.0;
    let a = first.alpha - second.alpha;
    let combined = if (w * a - -1.0).abs() < f64::EPSILON {
        w
    } else {
        (w + a) / (1.0 + w * a)
    };
    let w1 = (combined + 1.0) / 2.0;
    let w2 = 1.0 - w1;
    Color::rgba(
        first.red * w1 + second.red * w2,
        first.green * w1 + second.green * w2,
        first.blue * w1 + second.blue * w2,
        first.alpha * weight + second.alpha * (1.0 - weight),
    )
}

fn expect_number<'a>(value: &'a Value, name: &str) -> EvalResult<&'a SassNumber> {
    value.as_number().ok_or_else(|| {
        EvalError::TypeMismatch(format!(
            "${name}: {} is not a number.",
            ValueFormatter::inspect(value)
        ))
    })
}

/// A percentage amount; unitless numbers count as percent.
fn percent(n: &SassNumber, name: &str) -> EvalResult<f64> {
    match n.unit_str() {
        "" | "%" => Ok(n.value),
        other => Err(EvalError::InvalidArgument(format!(
            "${name}: Expected {}{other} to have unit \"%\" or no units.",
            crate::value::format_number(n.value)
        ))),
    }
}

/// Alpha-like value: `50%` or `0.5`.
fn unit_interval(n: &SassNumber) -> f64 {
    if n.unit_str() == "%" {
        n.value / 100.0
    } else {
        n.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn run(name: &'static str, positional: Vec<Value>) -> EvalResult<Value> {
        call(name, &Args::new(name, positional, IndexMap::new()))
    }

    fn run_named(name: &'static str, color: Value, named: &[(&str, Value)]) -> EvalResult<Value> {
        let named = named
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        call(name, &Args::new(name, vec![color], named))
    }

    fn hex(text: &str) -> Value {
        Value::Color(Color::from_hex(text).unwrap())
    }

    fn pct(n: f64) -> Value {
        Value::with_unit(n, "%")
    }

    #[test]
    fn test_rgb_and_rgba() {
        let red = run("rgb", vec![Value::number(255.0), Value::number(0.0), Value::number(0.0)]).unwrap();
        assert_eq!(red.to_css(), "#ff0000");
        let faded = run("rgba", vec![hex("#000"), Value::number(0.5)]).unwrap();
        assert_eq!(faded.to_css(), "rgba(0, 0, 0, 0.5)");
    }

    #[test]
    fn test_hsl() {
        let color = run("hsl", vec![Value::number(0.0), pct(100.0), pct(50.0)]).unwrap();
        assert_eq!(color.to_css(), "#ff0000");
    }

    #[test]
    fn test_lighten_darken() {
        assert_eq!(run("lighten", vec![hex("#000"), pct(10.0)]).unwrap().to_css(), "#1a1a1a");
        assert_eq!(run("darken", vec![hex("#fff"), pct(100.0)]).unwrap().to_css(), "#000000");
    }

    #[test]
    fn test_mix_even() {
        let mixed = run("mix", vec![hex("#000"), hex("#fff")]).unwrap();
        assert_eq!(mixed.to_css(), "#808080");
    }

    #[test]
    fn test_channel_accessors() {
        assert_eq!(run("red", vec![hex("#102030")]).unwrap(), Value::number(16.0));
        assert_eq!(run("alpha", vec![hex("#00000080")]).unwrap().to_css(), "0.5019607843");
        assert_eq!(run("lightness", vec![hex("#fff")]).unwrap().to_css(), "100%");
    }

    #[test]
    fn test_adjust_scale_change() {
        let adjusted = run_named("adjust", hex("#000"), &[("blue", Value::number(255.0))]).unwrap();
        assert_eq!(adjusted.to_css(), "#0000ff");
        let scaled = run_named("scale", hex("#000"), &[("lightness", pct(50.0))]).unwrap();
        assert_eq!(scaled.to_css(), "#808080");
        let changed = run_named("change", hex("#fff"), &[("alpha", Value::number(0.0))]).unwrap();
        assert_eq!(changed.to_css(), "rgba(255, 255, 255, 0)");
    }

    #[test]
    fn test_invert_complement_grayscale() {
        assert_eq!(run("invert", vec![hex("#000")]).unwrap().to_css(), "#ffffff");
        assert_eq!(run("complement", vec![hex("#f00")]).unwrap().to_css(), "#00ffff");
        assert_eq!(run("grayscale", vec![hex("#f00")]).unwrap().to_css(), "#808080");
    }

    #[test]
    fn test_opacity_helpers() {
        let half = run("transparentize", vec![hex("#000"), Value::number(0.5)]).unwrap();
        assert_eq!(half.to_css(), "rgba(0, 0, 0, 0.5)");
        let back = run("opacify", vec![half, Value::number(0.5)]).unwrap();
        assert_eq!(back.to_css(), "#000000");
    }

    #[test]
    fn test_ie_hex_str() {
        assert_eq!(run("ie-hex-str", vec![hex("#abc")]).unwrap().to_css(), "#FFAABBCC");
    }
}
