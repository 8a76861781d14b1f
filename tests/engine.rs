use proc_top::process::Granularity;
use proc_top::rank::SortKey;
use proc_top::render::{summary_line, DisplayMode, Frame, Renderer};
use proc_top::state::TopState;
use proc_top::testdata::{RecordedSnapshots, TestData, TestFrame, TestProcess, TestTask};
use proc_top::users::UserNames;

/// A /proc/<pid>/stat line with the given counters; unrelated fields are 0.
fn stat(pid: i32, name: &str, utime: u64, stime: u64) -> String {
    let mut fields = vec!["S".to_string()];
    fields.extend(std::iter::repeat("0".to_string()).take(10));
    fields.push(utime.to_string());
    fields.push(stime.to_string());
    fields.extend(std::iter::repeat("0".to_string()).take(7));
    fields.push("8388608".to_string());
    fields.push("16".to_string());
    fields.extend(std::iter::repeat("0".to_string()).take(14));
    fields.push("2".to_string());
    format!("{} ({}) {}\n", pid, name, fields.join(" "))
}

fn process(pid: i32, utime: u64, stime: u64) -> TestProcess {
    let line = stat(pid, "daemon", utime, stime);
    TestProcess {
        pid,
        stat: line.clone(),
        cmdline: String::new(),
        status: "Name:\tdaemon\nUid:\t0\t0\t0\t0\nGid:\t0\t0\t0\t0\n".into(),
        tasks: vec![TestTask { tid: pid, stat: line }],
    }
}

fn recorded(frames: Vec<TestFrame>) -> RecordedSnapshots {
    RecordedSnapshots::new(TestData {
        version: "1.0".into(),
        frames,
    })
}

fn render_plain(state: &TopState<RecordedSnapshots>, max_rows: Option<usize>) -> (String, usize) {
    let usage = proc_top::delta::CpuUsage::default();
    let mut renderer = Renderer::new(UserNames::with_resolver(|_| Some("root".into())), 4096);
    let mut out = Vec::new();
    let frame = Frame {
        generation: state.current().unwrap(),
        pool: state.pool(),
        usage: &usage,
        granularity: Granularity::Process,
        mode: DisplayMode::Plain,
        max_rows,
    };
    let rows = renderer.render(&mut out, &frame).unwrap();
    (String::from_utf8(out).unwrap(), rows)
}

#[test]
fn test_two_generation_cpu_share() {
    let frames = vec![
        TestFrame {
            stat: "cpu  1000 0 0 1000 0 0 0\n".into(),
            processes: vec![process(100, 50, 10)],
        },
        TestFrame {
            stat: "cpu  1500 0 0 1500 0 0 0\n".into(),
            processes: vec![process(100, 70, 15)],
        },
    ];
    let mut state = TopState::new(recorded(frames), Granularity::Process, SortKey::Cpu);
    state.sample().unwrap();
    state.sample().unwrap();
    let usage = state.compute();

    assert_eq!(usage.total_delta, 1000);
    assert_eq!(usage.delta.user, 500);
    assert!(summary_line(&usage).starts_with("User 50%,"));

    let gen = state.current().unwrap();
    let handle = gen.handles().next().unwrap();
    let rec = state.pool().get(handle);
    assert_eq!(rec.id.pid, 100);
    assert_eq!(rec.id.tid, 100);
    assert_eq!(rec.delta_utime, 20);
    assert_eq!(rec.delta_stime, 5);
    assert_eq!(rec.delta_time, 25);
    assert_eq!(usage.entity_percent(rec), 2);

    let mut renderer = Renderer::new(UserNames::with_resolver(|_| Some("root".into())), 4096);
    let mut out = Vec::new();
    let frame = Frame {
        generation: gen,
        pool: state.pool(),
        usage: &usage,
        granularity: Granularity::Process,
        mode: DisplayMode::Plain,
        max_rows: None,
    };
    renderer.render(&mut out, &frame).unwrap();
    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("  100  2   2% S     1    8192Ki      64Ki root     daemon"));
}

#[test]
fn test_pool_is_conserved_across_cycles() {
    let frames = (0..8u64)
        .map(|i| TestFrame {
            stat: format!("cpu  {} 0 0 {} 0 0 0\n", i * 10, i * 90),
            processes: (1..=5).map(|pid| process(pid, i * pid as u64, 0)).collect(),
        })
        .collect();
    let mut state = TopState::new(recorded(frames), Granularity::Process, SortKey::Cpu);
    state.sample().unwrap();

    let mut capacity = None;
    for _ in 0..7 {
        state.sample().unwrap();
        state.compute();
        assert_eq!(state.live_records(), 10);
        state.finish_cycle();

        let pool = state.pool();
        assert_eq!(state.live_records(), 5);
        assert_eq!(pool.in_use(), state.live_records());
        assert_eq!(pool.in_use() + pool.free_count(), pool.capacity());
        assert_eq!(*capacity.get_or_insert(pool.capacity()), pool.capacity());
    }
    assert_eq!(capacity, Some(10));

    state.shutdown();
    assert_eq!(state.pool().in_use(), 0);
    assert_eq!(state.pool().free_count(), 10);
}

#[test]
fn test_handles_are_never_shared() {
    let frames = (0..3u64)
        .map(|i| TestFrame {
            stat: format!("cpu  {} 0 0 0 0 0 0\n", i),
            processes: (1..=4).map(|pid| process(pid, i, 0)).collect(),
        })
        .collect();
    let mut state = TopState::new(recorded(frames), Granularity::Process, SortKey::Cpu);
    state.sample().unwrap();
    state.sample().unwrap();
    state.compute();

    let mut seen: Vec<usize> = state.current().unwrap().handles().map(|h| h.index()).collect();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), 4);
}

#[test]
fn test_row_cap_limits_output() {
    let frames = vec![TestFrame {
        stat: "cpu  0 0 0 0 0 0 0\n".into(),
        processes: (1..=12).map(|pid| process(pid, 0, 0)).collect(),
    }];
    let mut state = TopState::new(recorded(frames), Granularity::Process, SortKey::Cpu);
    state.sample().unwrap();
    state.compute();

    let (text, rows) = render_plain(&state, Some(5));
    assert_eq!(rows, 5);
    assert_eq!(text.matches("daemon").count(), 5);

    let (_, rows) = render_plain(&state, None);
    assert_eq!(rows, 12);
}

#[test]
fn test_thread_granularity_inherits_process_details() {
    let line = |tid: i32, utime: u64| stat(tid, "worker", utime, 0);
    let frame = |utime: u64| TestFrame {
        stat: format!("cpu  {} 0 0 100 0 0 0\n", utime),
        processes: vec![TestProcess {
            pid: 40,
            stat: stat(40, "server", utime, 0),
            cmdline: "/usr/sbin/server\0-d\0".into(),
            status: "Uid:\t33\t33\t33\t33\nGid:\t33\t33\t33\t33\n".into(),
            tasks: vec![
                TestTask { tid: 40, stat: line(40, utime) },
                TestTask { tid: 41, stat: line(41, utime * 3) },
            ],
        }],
    };
    let mut state = TopState::new(
        recorded(vec![frame(10), frame(20)]),
        Granularity::Thread,
        SortKey::Cpu,
    );
    state.sample().unwrap();
    state.sample().unwrap();
    state.compute();

    let recs: Vec<_> = state
        .current()
        .unwrap()
        .handles()
        .map(|h| state.pool().get(h))
        .collect();
    assert_eq!(recs.len(), 2);
    assert_eq!((recs[0].id.pid, recs[0].id.tid), (40, 41));
    assert_eq!(recs[0].delta_time, 30);
    assert_eq!(recs[1].delta_time, 10);
    for rec in recs {
        assert_eq!(rec.uid, 33);
        assert_eq!(rec.name, "/usr/sbin/server");
        assert_eq!(rec.thread_name, "worker");
    }
}

#[test]
fn test_thread_row_for_kernel_thread_shows_short_name() {
    let line = stat(2, "kthreadd", 0, 0);
    let frames = vec![TestFrame {
        stat: "cpu  0 0 0 0 0 0 0\n".into(),
        processes: vec![TestProcess {
            pid: 2,
            stat: line.clone(),
            cmdline: String::new(),
            status: "Uid:\t0\t0\t0\t0\nGid:\t0\t0\t0\t0\n".into(),
            tasks: vec![TestTask { tid: 2, stat: line }],
        }],
    }];
    let mut state = TopState::new(recorded(frames), Granularity::Thread, SortKey::Cpu);
    state.sample().unwrap();
    let usage = state.compute();

    let mut renderer = Renderer::new(UserNames::with_resolver(|_| Some("root".into())), 4096);
    let mut out = Vec::new();
    let frame = Frame {
        generation: state.current().unwrap(),
        pool: state.pool(),
        usage: &usage,
        granularity: Granularity::Thread,
        mode: DisplayMode::Plain,
        max_rows: None,
    };
    renderer.render(&mut out, &frame).unwrap();
    let text = String::from_utf8(out).unwrap();
    let row = text.lines().find(|l| l.contains("kthreadd")).unwrap();
    assert!(row.ends_with("kthreadd        kthreadd"), "{row}");
}
