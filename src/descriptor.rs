use crate::error::{WeaveError, WeaveResult};

pub(crate) const L_JAVA_LANG_OBJECT: &str = "Ljava/lang/Object;";
pub(crate) const L_JAVA_LANG_STRING: &str = "Ljava/lang/String;";
pub(crate) const L_JAVA_LANG_CLASS: &str = "Ljava/lang/Class;";

/// Field descriptor of a class given its internal name.
pub(crate) fn object_type(internal_name: &str) -> String {
    format!("L{internal_name};")
}

/// Insert `type_descriptor` as the first parameter.
pub(crate) fn prepend_argument(descriptor: &str, type_descriptor: &str) -> WeaveResult<String> {
    let open = descriptor
        .find('(')
        .ok_or_else(|| WeaveError::malformed(descriptor))?;
    let (head, tail) = descriptor.split_at(open + 1);
    Ok(format!("{head}{type_descriptor}{tail}"))
}

/// Insert `type_descriptor` as the last parameter.
pub(crate) fn append_argument(descriptor: &str, type_descriptor: &str) -> WeaveResult<String> {
    let close = close_paren(descriptor)?;
    let (head, tail) = descriptor.split_at(close);
    Ok(format!("{head}{type_descriptor}{tail}"))
}

/// Replace everything after `)` with `type_descriptor`.
pub(crate) fn change_return_type(descriptor: &str, type_descriptor: &str) -> WeaveResult<String> {
    let close = close_paren(descriptor)?;
    Ok(format!("{}{type_descriptor}", &descriptor[..=close]))
}

/// Split a method descriptor into its parameter type descriptors.
pub(crate) fn parameter_types(descriptor: &str) -> WeaveResult<Vec<String>> {
    let malformed = || WeaveError::malformed(descriptor);
    let params = descriptor
        .strip_prefix('(')
        .and_then(|rest| rest.split_once(')'))
        .map(|(params, _)| params)
        .ok_or_else(malformed)?;

    let mut types = Vec::new();
    let mut rest = params;
    while !rest.is_empty() {
        let len = field_type_len(rest).ok_or_else(malformed)?;
        let (head, tail) = rest.split_at(len);
        types.push(head.to_string());
        rest = tail;
    }
    Ok(types)
}

/// Local variable slots taken by a value of the given field type.
pub(crate) fn slot_size(field_type: &str) -> usize {
    match field_type {
        "J" | "D" => 2,
        _ => 1,
    }
}

fn close_paren(descriptor: &str) -> WeaveResult<usize> {
    descriptor
        .find(')')
        .ok_or_else(|| WeaveError::malformed(descriptor))
}

/// Length of the field type descriptor at the start of `text`.
fn field_type_len(text: &str) -> Option<usize> {
    let dims = text.bytes().take_while(|b| *b == b'[').count();
    let element = &text[dims..];
    let element_len = match element.as_bytes().first()? {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' => 1,
        b'L' => element.find(';').filter(|end| *end > 1)? + 1,
        _ => return None,
    };
    Some(dims + element_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prepend_argument_inserts_after_open_paren() {
        assert_eq!(
            prepend_argument("(I)V", L_JAVA_LANG_OBJECT).expect("prepend"),
            "(Ljava/lang/Object;I)V"
        );
        assert_eq!(
            prepend_argument("()J", "I").expect("prepend"),
            "(I)J"
        );
    }

    #[test]
    fn append_argument_inserts_before_close_paren() {
        assert_eq!(
            append_argument("(I)V", L_JAVA_LANG_STRING).expect("append"),
            "(ILjava/lang/String;)V"
        );
    }

    #[test]
    fn change_return_type_replaces_tail() {
        assert_eq!(
            change_return_type("(Ljava/lang/String;)V", "Lcom/example/Foo;").expect("change"),
            "(Ljava/lang/String;)Lcom/example/Foo;"
        );
        assert_eq!(change_return_type("", "V").ok(), None);
    }

    #[test]
    fn edits_reject_descriptors_without_delimiters() {
        assert_eq!(
            prepend_argument("I)V", "I"),
            Err(WeaveError::malformed("I)V"))
        );
        assert_eq!(
            append_argument("(IV", "I"),
            Err(WeaveError::malformed("(IV"))
        );
    }

    #[test]
    fn parameter_types_splits_primitives_objects_and_arrays() {
        let types =
            parameter_types("(IJ[Ljava/lang/String;[[DLjava/util/List;Z)V").expect("parse");

        assert_eq!(
            types,
            vec!["I", "J", "[Ljava/lang/String;", "[[D", "Ljava/util/List;", "Z"]
        );
        assert!(parameter_types("()V").expect("parse").is_empty());
    }

    #[test]
    fn only_long_and_double_take_two_slots() {
        assert_eq!(slot_size("J"), 2);
        assert_eq!(slot_size("D"), 2);
        assert_eq!(slot_size("[J"), 1);
        assert_eq!(slot_size("Ljava/lang/Double;"), 1);
        assert_eq!(slot_size("I"), 1);
    }

    #[test]
    fn parameter_types_rejects_bad_descriptors() {
        assert!(parameter_types("IV").is_err());
        assert!(parameter_types("(Q)V").is_err());
        assert!(parameter_types("(Ljava/lang/String)V").is_err());
        assert!(parameter_types("(L;)V").is_err());
        assert!(parameter_types("([)V").is_err());
    }
}
