//! Generated-sequence checks for artifact extraction and stream folding.

use cowork_client::{extract_artifacts, fold, Conversation, Role};
use cowork_protocol::Frame;

const PIECES: [&str; 11] = [
    "plain text ",
    "<artifact type=\"html\" title=\"Page\"><p>hi</p></artifact>",
    "<artifact type='svg'><svg/></artifact>",
    "<artifact title=\"untyped\">kept</artifact>",
    "\n",
    "<artifact type=\"python\">\nprint(1)\n</artifact >",
    "a < b and c > d ",
    "<artifact type=\"markdown\">",
    "</artifact>",
    "<artifac",
    "t type=\"json\">",
];

/// Small deterministic generator so failures reproduce.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        (self.0 >> 33) as usize
    }

    fn text(&mut self) -> String {
        let len = self.next() % 8;
        (0..len).map(|_| PIECES[self.next() % PIECES.len()]).collect()
    }
}

#[test]
fn extraction_is_idempotent_on_generated_text() {
    let mut rng = Lcg(7);
    for _ in 0..500 {
        let text = rng.text();
        let first = extract_artifacts(&text);
        let second = extract_artifacts(&first.cleaned_text);
        assert_eq!(second.cleaned_text, first.cleaned_text, "input: {text:?}");
        assert!(second.artifacts.is_empty(), "input: {text:?}");
    }
}

#[test]
fn extracted_blocks_leave_no_typed_markup_behind() {
    let mut rng = Lcg(11);
    for _ in 0..500 {
        let text = rng.text();
        let extraction = extract_artifacts(&text);
        for artifact in &extraction.artifacts {
            assert!(!artifact.kind.as_str().is_empty());
            assert!(text.contains(&artifact.content), "input: {text:?}");
            assert_eq!(artifact.content, artifact.content.trim());
        }
        assert!(extraction.cleaned_text.len() <= text.len());
    }
}

#[test]
fn completed_message_equals_stream_concatenation_minus_artifacts() {
    let mut rng = Lcg(23);
    for _ in 0..200 {
        let chunk_count = 1 + rng.next() % 6;
        let chunks: Vec<String> = (0..chunk_count).map(|_| rng.text()).collect();

        let mut frames = vec![Frame::Thinking { message: None }];
        frames.extend(chunks.iter().map(|content| Frame::Stream {
            content: content.clone(),
            session_id: None,
        }));
        frames.push(Frame::Complete {
            tools_used: None,
            content: None,
            session_id: None,
        });

        let conversation = frames.iter().fold(Conversation::new(), fold);
        let expected = extract_artifacts(&chunks.concat());

        assert_eq!(conversation.messages().len(), 1);
        let message = &conversation.messages()[0];
        assert!(message.is_complete);
        assert_eq!(message.content, expected.cleaned_text);
        assert_eq!(conversation.artifacts().len(), expected.artifacts.len());
    }
}

#[test]
fn at_most_one_message_is_ever_incomplete() {
    let mut rng = Lcg(41);
    for _ in 0..200 {
        let mut conversation = Conversation::new();
        for _ in 0..30 {
            let frame = match rng.next() % 4 {
                0 => Frame::Thinking { message: None },
                1 | 2 => Frame::Stream {
                    content: rng.text(),
                    session_id: None,
                },
                _ => Frame::Complete {
                    tools_used: None,
                    content: None,
                    session_id: None,
                },
            };
            conversation = fold(conversation, &frame);

            let open = conversation
                .messages()
                .iter()
                .filter(|message| !message.is_complete)
                .count();
            assert!(open <= 1);
            if let Some(open) = conversation.streaming_message() {
                assert_eq!(open.role, Role::Assistant);
                assert_eq!(
                    open.id,
                    conversation.messages().last().expect("open message").id
                );
            }
        }
    }
}
