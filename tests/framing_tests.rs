use ctrlcom::{CtrlComError, Framer, TransmissionMode};
use proptest::prelude::*;

fn hex_framer() -> Framer {
    let framer = Framer::new();
    framer.set_mode(TransmissionMode::Hex);
    framer
}

fn normalize(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase()
}

proptest! {
    /// decode(encode(H)) reproduces H modulo whitespace and case
    #[test]
    fn hex_round_trip(input in "([0-9a-fA-F]{2}[ ]?){0,32}") {
        let framer = hex_framer();

        let bytes = framer.encode(&input).unwrap();
        let rendered = framer.decode(&bytes);

        prop_assert_eq!(normalize(&rendered), normalize(&input));
    }

    /// Re-encoding the rendered display form reproduces the original bytes
    #[test]
    fn rendered_form_is_stable(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let framer = hex_framer();

        let rendered = framer.decode(&bytes);
        let decoded = framer.encode(&rendered).unwrap();

        prop_assert_eq!(decoded, bytes);
    }

    /// An odd digit count always fails, regardless of spacing
    #[test]
    fn odd_digit_count_rejected(input in "([0-9a-fA-F]{2}[ ]?){0,16}[0-9a-fA-F]") {
        let framer = hex_framer();

        let result = framer.encode(&input);
        prop_assert!(matches!(result, Err(CtrlComError::MalformedHexInput(_))));
    }

    /// Text mode terminates every payload with a single newline
    #[test]
    fn text_mode_appends_terminator(payload in "[ -~]{0,64}") {
        let framer = Framer::new();

        let bytes = framer.encode(&payload).unwrap();
        prop_assert_eq!(bytes, format!("{}\n", payload).into_bytes());
    }
}

#[test]
fn non_hex_characters_rejected() {
    let framer = hex_framer();

    for input in ["0G", "zz", "1A 2Q", "0x1A"] {
        assert!(
            matches!(framer.encode(input), Err(CtrlComError::MalformedHexInput(_))),
            "expected '{}' to be rejected",
            input
        );
    }
}
