// File: kannon-server/src/console.rs
//
// Line-based stand-in for the keyboard and gamepad adapters.

use kannon_common::models::{
    AudioFrame, ControlInput, Direction, NormalizedOffset, SkeletalFrame, SkeletalTargetId,
    TargetSelection, TrackingMode,
};

pub const HELP: &str = "\
Commands:
  1 | 2 | 3                 manual / skeletal / audible mode
  up | down | left | right  nudge (manual mode)
  stick <x> <y>             analog stick, each in [-1, 1]
  z x c v b n               skeletal target A-F
  next | prev | reset       cycle or reset skeletal target
  skel <body> [<x> <y>]     skeletal frame; omit x/y for not tracked
  audio <bearing> [<conf>]  audio beam frame
  a | s | d | f [off]       rage limit up / down / right / left
  p                         toggle safety
  fire | space              fire
  cancel                    end the active pulse
  stop                      emergency stop
  reinit                    re-initialize pan/tilt
  status
  attach | detach
  quit
";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Input(ControlInput),
    Status,
    Attach,
    Detach,
    CancelFire,
    EmergencyStop,
    Reinitialize,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_line(line: &str) -> ConsoleCommand {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(first) = parts.first() else {
        // A bare space is the fire key.
        return if line.contains(' ') {
            ConsoleCommand::Input(ControlInput::RequestFire)
        } else {
            ConsoleCommand::Empty
        };
    };
    let cmd = first.to_lowercase();
    let args = &parts[1..];

    let input = match cmd.as_str() {
        "1" => ControlInput::SelectMode(TrackingMode::Manual),
        "2" => ControlInput::SelectMode(TrackingMode::Skeletal),
        "3" => ControlInput::SelectMode(TrackingMode::Audible),
        "up" | "down" | "left" | "right" => match cmd.parse::<Direction>() {
            Ok(dir) => ControlInput::ManualNudge(dir),
            Err(e) => return ConsoleCommand::Unknown(e),
        },
        "stick" => match (parse_f64(args, 0), parse_f64(args, 1)) {
            (Some(x), Some(y)) => ControlInput::ManualStick { x, y },
            _ => return ConsoleCommand::Unknown("usage: stick <x> <y>".into()),
        },
        "z" | "x" | "c" | "v" | "b" | "n" => {
            let id = match cmd.as_str() {
                "z" => SkeletalTargetId::A,
                "x" => SkeletalTargetId::B,
                "c" => SkeletalTargetId::C,
                "v" => SkeletalTargetId::D,
                "b" => SkeletalTargetId::E,
                _ => SkeletalTargetId::F,
            };
            ControlInput::SelectSkeletalTarget(TargetSelection::Letter(id))
        }
        "next" => ControlInput::SelectSkeletalTarget(TargetSelection::Next),
        "prev" => ControlInput::SelectSkeletalTarget(TargetSelection::Prev),
        "reset" => ControlInput::SelectSkeletalTarget(TargetSelection::Reset),
        "skel" => {
            let Some(body_index) = args.first().and_then(|s| s.parse::<usize>().ok()) else {
                return ConsoleCommand::Unknown("usage: skel <body> [<x> <y>]".into());
            };
            match (parse_f64(args, 1), parse_f64(args, 2)) {
                (Some(x), Some(y)) => ControlInput::SkeletalFrame(SkeletalFrame::tracked(
                    body_index,
                    NormalizedOffset::new(x, y),
                )),
                _ => ControlInput::SkeletalFrame(SkeletalFrame::not_tracked(body_index)),
            }
        }
        "audio" => {
            let Some(bearing_radians) = parse_f64(args, 0) else {
                return ConsoleCommand::Unknown("usage: audio <bearing> [<conf>]".into());
            };
            let confidence = parse_f64(args, 1).unwrap_or(1.0);
            ControlInput::AudioFrame(AudioFrame { bearing_radians, confidence })
        }
        "a" | "s" | "d" | "f" => {
            let direction = match cmd.as_str() {
                "a" => Direction::Up,
                "s" => Direction::Down,
                "d" => Direction::Right,
                _ => Direction::Left,
            };
            let triggered = !matches!(args.first(), Some(&"off"));
            ControlInput::RageLimit { direction, triggered }
        }
        "p" => ControlInput::ToggleSafety,
        "fire" | "space" => ControlInput::RequestFire,
        "cancel" => return ConsoleCommand::CancelFire,
        "stop" => return ConsoleCommand::EmergencyStop,
        "reinit" => return ConsoleCommand::Reinitialize,
        "status" => return ConsoleCommand::Status,
        "attach" => return ConsoleCommand::Attach,
        "detach" => return ConsoleCommand::Detach,
        "help" => return ConsoleCommand::Help,
        "quit" | "exit" => return ConsoleCommand::Quit,
        other => return ConsoleCommand::Unknown(format!("unknown command '{}'", other)),
    };
    ConsoleCommand::Input(input)
}

fn parse_f64(args: &[&str], idx: usize) -> Option<f64> {
    args.get(idx).and_then(|s| s.parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(line: &str) -> ControlInput {
        match parse_line(line) {
            ConsoleCommand::Input(i) => i,
            other => panic!("'{}' parsed as {:?}", line, other),
        }
    }

    #[test]
    fn test_mode_and_nudge_keys() {
        assert_eq!(input("2"), ControlInput::SelectMode(TrackingMode::Skeletal));
        assert_eq!(input("UP"), ControlInput::ManualNudge(Direction::Up));
        assert_eq!(input("left"), ControlInput::ManualNudge(Direction::Left));
    }

    #[test]
    fn test_target_letters() {
        assert_eq!(
            input("v"),
            ControlInput::SelectSkeletalTarget(TargetSelection::Letter(SkeletalTargetId::D))
        );
        assert_eq!(
            input("n"),
            ControlInput::SelectSkeletalTarget(TargetSelection::Letter(SkeletalTargetId::F))
        );
        assert_eq!(input("reset"), ControlInput::SelectSkeletalTarget(TargetSelection::Reset));
    }

    #[test]
    fn test_rage_keys_and_release() {
        assert_eq!(input("d"), ControlInput::RageLimit { direction: Direction::Right, triggered: true });
        assert_eq!(input("f off"), ControlInput::RageLimit { direction: Direction::Left, triggered: false });
    }

    #[test]
    fn test_fire_and_safety() {
        assert_eq!(input("p"), ControlInput::ToggleSafety);
        assert_eq!(input("fire"), ControlInput::RequestFire);
        assert_eq!(input(" "), ControlInput::RequestFire);
        assert_eq!(parse_line(""), ConsoleCommand::Empty);
    }

    #[test]
    fn test_frames() {
        assert_eq!(
            input("skel 2 0.5 -0.5"),
            ControlInput::SkeletalFrame(SkeletalFrame::tracked(2, NormalizedOffset::new(0.5, -0.5)))
        );
        assert_eq!(input("skel 0"), ControlInput::SkeletalFrame(SkeletalFrame::not_tracked(0)));
        assert_eq!(
            input("audio -0.3"),
            ControlInput::AudioFrame(AudioFrame { bearing_radians: -0.3, confidence: 1.0 })
        );
        assert!(matches!(parse_line("stick 1"), ConsoleCommand::Unknown(_)));
    }

    #[test]
    fn test_non_input_commands() {
        assert_eq!(parse_line("status"), ConsoleCommand::Status);
        assert_eq!(parse_line("quit"), ConsoleCommand::Quit);
        assert!(matches!(parse_line("warp 9"), ConsoleCommand::Unknown(_)));
    }
}
