use crate::config::{Policy, SimConfig};
use crate::model::{OpKind, Process, Sector};

/// A ready-to-run workload: configuration, policy and process set.
pub struct Scenario {
    pub number: u32,
    pub title: &'static str,
    pub policy: Policy,
    pub config: SimConfig,
    pub processes: Vec<Process>,
}

fn proc(name: &str, ops: &[(OpKind, Sector)]) -> Process {
    Process::new(name, ops.to_vec())
}

/// Builds scenario `n`; anything out of range falls back to scenario 1.
pub fn by_number(n: u32) -> Scenario {
    use OpKind::{Read, Write};

    let config = SimConfig::default();
    match n {
        2 => Scenario {
            number: 2,
            title: "Sector 100 modification operation (FIFO)",
            policy: Policy::Fifo,
            config,
            processes: vec![proc("yyy", &[(Write, 100)])],
        },
        3 => Scenario {
            number: 3,
            title: "Sector 100 read, sector 1000 modification (FIFO)",
            policy: Policy::Fifo,
            config,
            processes: vec![proc("yyy", &[(Read, 100)]), proc("qqq", &[(Write, 1000)])],
        },
        4 => Scenario {
            number: 4,
            title: "Sector 100 read by two processes (FIFO)",
            policy: Policy::Fifo,
            config,
            processes: vec![proc("yyy", &[(Read, 100)]), proc("qqq", &[(Read, 100)])],
        },
        5 => Scenario {
            number: 5,
            title: "Insufficient amount of buffers for all the blocks (FIFO)",
            policy: Policy::Fifo,
            config,
            processes: vec![proc(
                "yyy",
                &[
                    (Read, 100),
                    (Read, 110),
                    (Read, 120),
                    (Read, 130),
                    (Read, 140),
                    (Read, 150),
                    (Read, 160),
                    (Read, 170),
                    (Read, 180),
                    (Read, 190),
                    (Write, 200),
                ],
            )],
        },
        6 => Scenario {
            number: 6,
            title: "Sector 100 read and write by different processes (LOOK track_read_max 1)",
            policy: Policy::Look,
            config,
            processes: vec![proc("yyy", &[(Read, 100)]), proc("qqq", &[(Write, 100)])],
        },
        7 => Scenario {
            number: 7,
            title: "Sectors 100, 110, 1500 read by different processes (LOOK track_read_max 1)",
            policy: Policy::Look,
            config,
            processes: vec![
                proc("yyy", &[(Read, 100)]),
                proc("qqq", &[(Read, 110)]),
                proc("eee", &[(Read, 1500)]),
            ],
        },
        8 => Scenario {
            number: 8,
            title: "Sectors 100, 110, 1500 read by different processes (LOOK track_read_max 2)",
            policy: Policy::Look,
            config: SimConfig {
                look_track_read_max: 2,
                ..SimConfig::default()
            },
            processes: vec![
                proc("yyy", &[(Read, 100)]),
                proc("qqq", &[(Read, 110)]),
                proc("eee", &[(Read, 1500)]),
            ],
        },
        9 => Scenario {
            number: 9,
            title: "Four processes with different operations (NLOOK num 10)",
            policy: Policy::Nlook,
            config,
            processes: vec![
                proc("yyy", &[(Read, 1000), (Read, 1500), (Read, 100)]),
                proc("qqq", &[(Write, 150), (Read, 700), (Read, 1250)]),
                proc("eee", &[(Read, 3000), (Write, 1550), (Read, 2700)]),
                proc("nnn", &[(Write, 1110), (Read, 3100)]),
            ],
        },
        _ => Scenario {
            number: 1,
            title: "Sector 100 read operation (FIFO)",
            policy: Policy::Fifo,
            config,
            processes: vec![proc("yyy", &[(Read, 100)])],
        },
    }
}

/// All nine scenarios in menu order.
pub fn all() -> Vec<Scenario> {
    (1..=9).map(by_number).collect()
}

/// The eight-process workload the three policies are compared on.
pub fn comparison_processes() -> Vec<Process> {
    use OpKind::{Read, Write};
    vec![
        proc("yyy", &[(Read, 1000), (Read, 1500), (Read, 100)]),
        proc("qqq", &[(Write, 150), (Read, 700), (Read, 1250)]),
        proc("eee", &[(Read, 2950), (Write, 250), (Read, 2700)]),
        proc("nnn", &[(Write, 1110), (Read, 350)]),
        proc("yyy1", &[(Read, 2100), (Read, 3700), (Read, 270)]),
        proc("qqq1", &[(Write, 3290), (Read, 490), (Read, 1250)]),
        proc("eee1", &[(Read, 380), (Write, 1550), (Read, 2300)]),
        proc("nnn1", &[(Write, 1250), (Read, 190)]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_number_falls_back_to_scenario_one() {
        let sc = by_number(42);
        assert_eq!(sc.number, 1);
        assert_eq!(sc.policy, Policy::Fifo);
        assert_eq!(sc.processes.len(), 1);
    }

    #[test]
    fn scenario_eight_raises_the_track_budget() {
        assert_eq!(by_number(7).config.look_track_read_max, 1);
        assert_eq!(by_number(8).config.look_track_read_max, 2);
    }

    #[test]
    fn all_lists_nine_scenarios() {
        let numbers: Vec<u32> = all().iter().map(|s| s.number).collect();
        assert_eq!(numbers, (1..=9).collect::<Vec<_>>());
    }
}
