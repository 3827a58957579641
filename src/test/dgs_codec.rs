use std::collections::{BTreeMap, HashMap};

use crate::Error;
use crate::dgs::{EdgeOp, decode, encode_to_string};
use crate::trace::{
    CoalesceOpts, ContactRecord, Event, EventStream, NodeName, Pair, StepEvents, coalesce,
    parse_contacts,
};

fn rec(a: u64, b: u64, start: u64, end: u64) -> ContactRecord {
    ContactRecord {
        observer: NodeName::Num(a),
        observed: NodeName::Num(b),
        start,
        end,
    }
}

type Intervals = BTreeMap<(String, String), Vec<(u64, u64)>>;

fn stream_intervals(stream: &EventStream) -> Intervals {
    stream
        .intervals()
        .into_iter()
        .map(|(pair, iv)| ((pair.low().to_string(), pair.high().to_string()), iv))
        .collect()
}

fn document_intervals(text: &str) -> Intervals {
    let doc = decode(text).expect("decode");
    let mut open: HashMap<String, (String, String, u64)> = HashMap::new();
    let mut out = Intervals::new();
    for st in &doc.steps {
        for op in &st.ops {
            match op {
                EdgeOp::Add { edge, a, b, .. } => {
                    open.insert(edge.clone(), (a.clone(), b.clone(), st.step));
                }
                EdgeOp::Delete { edge, .. } => {
                    let (a, b, start) = open.remove(edge).expect("tracked add");
                    out.entry((a, b)).or_default().push((start, st.step));
                }
            }
        }
    }
    out
}

#[test]
fn encode_writes_header_nodes_and_named_edges() {
    let stream = coalesce(
        &[rec(1, 2, 10, 20), rec(3, 2, 15, 15)],
        &CoalesceOpts::default(),
    )
    .expect("coalesce");
    let text = encode_to_string(&stream, "contacts").expect("encode");
    let expected = "\
DGS004
contacts 5 7
st 0
an n1
an n2
an n3
st 10
ae e0 n1 n2
st 15
ae e1 n2 n3
st 20
de e0
st 25
de e1
";
    assert_eq!(text, expected);
}

#[test]
fn decode_reads_what_encode_writes() {
    let stream = coalesce(
        &[
            rec(1, 2, 10, 10),
            rec(2, 1, 15, 15),
            rec(1, 3, 12, 40),
            rec(3, 2, 50, 60),
            rec(1, 2, 100, 130),
        ],
        &CoalesceOpts::default(),
    )
    .expect("coalesce");
    let text = encode_to_string(&stream, "contacts").expect("encode");

    let doc = decode(&text).expect("decode");
    assert_eq!(doc.graph_name, "contacts");
    assert_eq!(doc.nodes, vec!["n1", "n2", "n3"]);
    assert_eq!(doc.declared_steps as usize, doc.step_count());
    assert_eq!(doc.declared_events as usize, doc.event_count());

    assert_eq!(document_intervals(&text), stream_intervals(&stream));
}

#[test]
fn contact_at_time_zero_shifts_every_step_past_setup() {
    let records = parse_contacts("1\t2\t0\t5\t1\t0\n2\t3\t8\t8\t1\t0\n").expect("parse");
    let stream = coalesce(&records, &CoalesceOpts::default()).expect("coalesce");
    assert_eq!(stream.steps[0].step, 0);

    let text = encode_to_string(&stream, "contacts").expect("encode");
    let doc = decode(&text).expect("decode");
    let steps: Vec<u64> = doc.steps.iter().map(|s| s.step).collect();
    assert_eq!(steps, vec![1, 6, 9, 19]);

    let shifted: Intervals = stream_intervals(&stream)
        .into_iter()
        .map(|(k, iv)| (k, iv.into_iter().map(|(a, b)| (a + 1, b + 1)).collect()))
        .collect();
    assert_eq!(document_intervals(&text), shifted);
}

#[test]
fn stream_without_step_zero_is_not_shifted() {
    let pair = Pair::new(NodeName::Num(1), NodeName::Num(2));
    let stream = EventStream {
        nodes: [NodeName::Num(1), NodeName::Num(2)].into_iter().collect(),
        steps: vec![
            StepEvents {
                step: 3,
                events: vec![Event::AddEdge(pair.clone())],
            },
            StepEvents {
                step: 7,
                events: vec![Event::DeleteEdge(pair)],
            },
        ],
    };
    let text = encode_to_string(&stream, "contacts").expect("encode");
    assert!(text.contains("st 3\nae e0 n1 n2\nst 7\nde e0\n"), "{text}");
}

#[test]
fn colliding_node_labels_are_rejected() {
    let records = parse_contacts("5\tn5\t1\t5\n").expect("parse");
    let stream = coalesce(&records, &CoalesceOpts::default()).expect("coalesce");
    match encode_to_string(&stream, "contacts") {
        Err(Error::Invariant(msg)) => {
            assert!(msg.contains("Num(5)"), "{msg}");
            assert!(msg.contains("\"n5\""), "{msg}");
        }
        other => panic!("expected invariant violation, got {other:?}"),
    }
}

#[test]
fn named_and_numeric_nodes_coexist_when_labels_differ() {
    let records = parse_contacts("5\talice\t1\t5\n").expect("parse");
    let stream = coalesce(&records, &CoalesceOpts::default()).expect("coalesce");
    let text = encode_to_string(&stream, "contacts").expect("encode");
    let doc = decode(&text).expect("decode");
    assert_eq!(doc.nodes, vec!["n5", "alice"]);
}

#[test]
fn encode_rejects_multi_token_graph_name() {
    let stream = EventStream::default();
    assert!(matches!(
        encode_to_string(&stream, "two words"),
        Err(Error::Config(_))
    ));
}

#[test]
fn decode_ignores_comments_and_node_attributes() {
    let text = "\
# generated
DGS004
g 0 0

st 0
an n1 x=1 y=2
an n2
st 5
ae e0 n1 n2
";
    let doc = decode(text).expect("decode");
    assert_eq!(doc.nodes, vec!["n1", "n2"]);
    assert_eq!(doc.steps.len(), 1);
    assert_eq!(doc.steps[0].step, 5);
    assert_eq!(doc.steps[0].ops[0].line(), 9);
}

#[test]
fn decode_rejects_unknown_format_tag() {
    let err = decode("DGS003\ng 1 0\nst 0\n").expect_err("bad tag");
    assert!(matches!(err, Error::Format { line: 1, .. }));
}

#[test]
fn decode_rejects_edge_ops_in_setup_step() {
    let err = decode("DGS004\ng 2 3\nst 0\nan n1\nae e0 n1 n2\n").expect_err("ae in setup");
    match err {
        Error::Format { line, msg } => {
            assert_eq!(line, 5);
            assert!(msg.contains("setup step 0"), "{msg}");
        }
        other => panic!("expected format error, got {other:?}"),
    }
}

#[test]
fn decode_rejects_node_declarations_after_setup() {
    let err = decode("DGS004\ng 2 2\nst 0\nan n1\nst 3\nan n2\n").expect_err("late an");
    assert!(matches!(err, Error::Format { line: 6, .. }));
}

#[test]
fn decode_requires_strictly_increasing_steps() {
    let err = decode("DGS004\ng 0 0\nst 0\nst 4\nst 4\n").expect_err("repeated step");
    assert!(matches!(err, Error::Format { line: 5, .. }));
    let err = decode("DGS004\ng 0 0\nst 0\nst 9\nst 2\n").expect_err("decreasing step");
    assert!(matches!(err, Error::Format { line: 5, .. }));
}

#[test]
fn decode_rejects_directed_edges_and_self_loops() {
    let directed = decode("DGS004\ng 0 0\nst 0\nst 1\nae e0 n1 > n2\n");
    assert!(matches!(directed, Err(Error::Format { line: 5, .. })));
    let self_loop = decode("DGS004\ng 0 0\nst 0\nst 1\nae e0 n1 n1\n");
    assert!(matches!(self_loop, Err(Error::Format { line: 5, .. })));
}

#[test]
fn decode_rejects_unknown_action_and_missing_setup() {
    let unknown = decode("DGS004\ng 0 0\nst 0\nst 1\ncn n1\n");
    assert!(matches!(unknown, Err(Error::Format { line: 5, .. })));
    let no_setup = decode("DGS004\ng 0 0\nst 1\n");
    assert!(matches!(no_setup, Err(Error::Format { line: 3, .. })));
}

#[test]
fn decode_tolerates_wrong_declared_counts() {
    let doc = decode("DGS004\ng 99 99\nst 0\nan n1\nan n2\nst 1\nae e0 n1 n2\n")
        .expect("count mismatch is only a warning");
    assert_eq!(doc.step_count(), 2);
    assert_eq!(doc.event_count(), 3);
}
