//! Path and link indexes over an object tree.

use dagcbor_types::{Cid, Node};

/// Every path in `root` and every link, in one pre-order pass.
///
/// Containers and leaves both contribute their path; list elements are
/// addressed by position. Links are leaves.
pub(crate) fn index(root: &Node) -> (Vec<String>, Vec<Cid>) {
    let mut paths = Vec::new();
    let mut links = Vec::new();
    walk(root, "", &mut paths, &mut links);
    (paths, links)
}

fn walk(node: &Node, cur: &str, paths: &mut Vec<String>, links: &mut Vec<Cid>) {
    if !cur.is_empty() {
        paths.push(cur.to_owned());
    }
    match node {
        Node::Map(map) => {
            for (key, value) in map {
                walk(value, &join(cur, key), paths, links);
            }
        }
        Node::List(items) => {
            for (i, value) in items.iter().enumerate() {
                walk(value, &join(cur, &i.to_string()), paths, links);
            }
        }
        Node::Link(cid) => links.push(*cid),
        _ => {}
    }
}

fn join(cur: &str, segment: &str) -> String {
    if cur.is_empty() {
        segment.to_owned()
    } else {
        format!("{cur}/{segment}")
    }
}

/// Paths under `prefix` with the prefix removed.
///
/// Matching is by whole segments, so `"cat"` does not select `"cats/x"`.
/// A negative `depth` keeps everything, otherwise only suffixes with at
/// most `depth` segments are kept.
pub(crate) fn select(paths: &[String], prefix: &str, depth: i32) -> Vec<String> {
    if depth == 0 {
        return Vec::new();
    }
    let prefix = prefix.trim_matches('/');
    paths
        .iter()
        .filter_map(|path| {
            if prefix.is_empty() {
                Some(path.as_str())
            } else {
                path.strip_prefix(prefix)?.strip_prefix('/')
            }
        })
        .filter(|sub| {
            depth < 0 || sub.split('/').count() <= usize::try_from(depth).unwrap_or(0)
        })
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dagcbor_hash::CidPrefix;

    fn sample() -> Node {
        let inner: Node = [("b", Node::from(1)), ("c", Node::from(2))]
            .into_iter()
            .collect();
        [("a", inner)].into_iter().collect()
    }

    fn sorted(mut v: Vec<String>) -> Vec<String> {
        v.sort();
        v
    }

    #[test]
    fn index_lists_containers_and_leaves() {
        let (paths, links) = index(&sample());
        assert_eq!(sorted(paths), vec!["a", "a/b", "a/c"]);
        assert!(links.is_empty());
    }

    #[test]
    fn list_elements_are_positional() {
        let cid = CidPrefix::default().sum(b"x").unwrap();
        let list: Node = vec![Node::Link(cid), Node::from("c")].into_iter().collect();
        let root: Node = [("baz", list)].into_iter().collect();
        let (paths, links) = index(&root);
        assert_eq!(paths, vec!["baz", "baz/0", "baz/1"]);
        assert_eq!(links, vec![cid]);
    }

    #[test]
    fn scalar_root_has_no_paths() {
        let (paths, links) = index(&Node::from("leaf"));
        assert!(paths.is_empty());
        assert!(links.is_empty());
    }

    #[test]
    fn select_by_prefix_and_depth() {
        let (paths, _) = index(&sample());
        assert_eq!(sorted(select(&paths, "", -1)), vec!["a", "a/b", "a/c"]);
        assert!(select(&paths, "", 0).is_empty());
        assert_eq!(select(&paths, "", 1), vec!["a"]);
        assert_eq!(sorted(select(&paths, "a", -1)), vec!["b", "c"]);
        assert_eq!(sorted(select(&paths, "/a/", -1)), vec!["b", "c"]);
    }

    #[test]
    fn prefix_matches_whole_segments() {
        let paths = vec!["cat".to_owned(), "cats".to_owned(), "cats/x".to_owned()];
        assert!(select(&paths, "cat", -1).is_empty());
        assert_eq!(select(&paths, "cats", -1), vec!["x"]);
    }
}
