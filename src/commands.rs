use std::str::FromStr;

use rem_engine::measurement::{Ear, MeasurementType, PrescriptionMethod, SignalType, VentType};
use rem_engine::Command;

/// One parsed REPL line.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Forwarded to the controller as-is
    Engine(Command),
    /// Start a measurement; `None` means the active measurement type
    Measure(Option<MeasurementType>),
    Status,
    Json,
    Patients,
    Aids,
    Help,
    Quit,
    Empty,
}

pub const HELP: &str = "\
Setup:       patient <id> | aid <id> | ear <left|right> | vent <closed|small|medium|large|open>
Signal:      signal <ists|pink|white|sweep> | level <dB> | play | stop
Probe:       depth <mm>
Measuring:   measure [reur|reor|rear|reig|recd|resr]
Targets:     method <nal-nl2|dsl-v5|nal-nl1|custom> | targets
Adjusting:   adjust <Hz> <+/-dB> | reset | check | finish
Navigation:  next | back
Other:       status | json | patients | aids | dismiss | help | quit";

/// Parse one line of operator input. Blank lines and `#` comments are `Empty`.
pub fn parse_line(line: &str) -> Result<Input, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(Input::Empty);
    }

    let mut words = line.split_whitespace();
    let verb = words.next().unwrap_or_default().to_ascii_lowercase();
    let args: Vec<&str> = words.collect();

    let input = match verb.as_str() {
        "patient" => Input::Engine(Command::SelectPatient(one(&verb, &args)?.to_string())),
        "aid" => Input::Engine(Command::SelectHearingAid(one(&verb, &args)?.to_string())),
        "ear" => Input::Engine(Command::SelectEar(parse_arg::<Ear>(&verb, &args)?)),
        "vent" => Input::Engine(Command::SelectVent(parse_arg::<VentType>(&verb, &args)?)),
        "signal" => Input::Engine(Command::SelectSignal(parse_arg::<SignalType>(&verb, &args)?)),
        "level" => Input::Engine(Command::SetLevel(parse_arg::<f32>(&verb, &args)?)),
        "method" => Input::Engine(Command::SelectMethod(parse_arg::<PrescriptionMethod>(
            &verb, &args,
        )?)),
        "depth" => Input::Engine(Command::SetProbeDepth(parse_arg::<f32>(&verb, &args)?)),
        "measure" => match args.as_slice() {
            [] => Input::Measure(None),
            _ => Input::Measure(Some(parse_arg::<MeasurementType>(&verb, &args)?)),
        },
        "targets" => Input::Engine(Command::GenerateTargets),
        "adjust" => {
            let [frequency, delta] = args.as_slice() else {
                return Err("usage: adjust <Hz> <+/-dB>".to_string());
            };
            let frequency = frequency
                .parse::<u32>()
                .map_err(|_| format!("Invalid frequency: {}", frequency))?;
            let delta = delta
                .parse::<f32>()
                .map_err(|_| format!("Invalid gain change: {}", delta))?;
            Input::Engine(Command::AdjustGain { frequency, delta })
        }
        "reset" => Input::Engine(Command::ResetAdjustments),
        "check" => Input::Engine(Command::CheckTargetMatch),
        "finish" | "complete" => Input::Engine(Command::CompleteSession),
        "next" => Input::Engine(Command::Next),
        "back" => Input::Engine(Command::Back),
        "play" => Input::Engine(Command::PlaySignal),
        "stop" => Input::Engine(Command::StopSignal),
        "dismiss" => Input::Engine(Command::DismissMessage),
        "status" => Input::Status,
        "json" => Input::Json,
        "patients" => Input::Patients,
        "aids" => Input::Aids,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => return Err(format!("Unknown command '{}'. Type 'help'.", other)),
    };
    Ok(input)
}

fn one<'a>(verb: &str, args: &[&'a str]) -> Result<&'a str, String> {
    match args {
        [value] => Ok(*value),
        _ => Err(format!("usage: {} <value>", verb)),
    }
}

fn parse_arg<T: FromStr>(verb: &str, args: &[&str]) -> Result<T, String> {
    let value = one(verb, args)?;
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid value for {}: {}", verb, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_commands() {
        assert_eq!(
            parse_line("patient P001").unwrap(),
            Input::Engine(Command::SelectPatient("P001".to_string()))
        );
        assert_eq!(
            parse_line("  EAR left ").unwrap(),
            Input::Engine(Command::SelectEar(Ear::Left))
        );
        assert_eq!(
            parse_line("vent open").unwrap(),
            Input::Engine(Command::SelectVent(VentType::Open))
        );
        assert_eq!(
            parse_line("method dsl-v5").unwrap(),
            Input::Engine(Command::SelectMethod(PrescriptionMethod::DslV5))
        );
        assert_eq!(
            parse_line("level 62.5").unwrap(),
            Input::Engine(Command::SetLevel(62.5))
        );
    }

    #[test]
    fn test_measure_with_and_without_type() {
        assert_eq!(parse_line("measure").unwrap(), Input::Measure(None));
        assert_eq!(
            parse_line("measure reig").unwrap(),
            Input::Measure(Some(MeasurementType::Reig))
        );
        assert!(parse_line("measure xyz").is_err());
    }

    #[test]
    fn test_adjust_arguments() {
        assert_eq!(
            parse_line("adjust 2000 +3").unwrap(),
            Input::Engine(Command::AdjustGain {
                frequency: 2000,
                delta: 3.0
            })
        );
        assert_eq!(
            parse_line("adjust 500 -1.5").unwrap(),
            Input::Engine(Command::AdjustGain {
                frequency: 500,
                delta: -1.5
            })
        );
        assert!(parse_line("adjust 2000").is_err());
        assert!(parse_line("adjust 2k 3").is_err());
    }

    #[test]
    fn test_blank_and_comment_lines() {
        assert_eq!(parse_line("").unwrap(), Input::Empty);
        assert_eq!(parse_line("   # warm-up").unwrap(), Input::Empty);
    }

    #[test]
    fn test_errors_name_the_problem() {
        let err = parse_line("fly away").unwrap_err();
        assert!(err.contains("fly"));
        let err = parse_line("depth").unwrap_err();
        assert!(err.contains("usage"));
        let err = parse_line("depth deep").unwrap_err();
        assert!(err.contains("deep"));
    }
}
