// Expression parser and position metadata builder.
//
// The parser is a dual-stack shift-reduce scan. Every operand pushed is an
// arena node whose nullable/first/last data is computed as soon as the node
// is built, and the shared follow table is updated as a side effect. The
// arena itself is dropped once the root's first set has been taken.

use std::fmt;

use hashbrown::HashMap;
use relations_core::{END_MARKER, ParseError, Position, PositionSet, Rule};

/// Handle of a node in the parse arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeId(u32);

#[derive(Debug, Clone, Copy)]
enum NodeKind {
    Leaf(Position),
    Star(NodeId),
    Union(NodeId, NodeId),
    Concat(NodeId, NodeId),
}

/// Derived data of one arena node.
#[derive(Debug)]
struct Node {
    nullable: bool,
    first: PositionSet,
    last: PositionSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Binary {
    Union,
    Concat,
}

/// Entries on the operator stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Open,
    Op(Binary),
}

impl Pending {
    fn symbol(self) -> char {
        match self {
            Pending::Open => '(',
            Pending::Op(Binary::Union) => '+',
            Pending::Op(Binary::Concat) => '.',
        }
    }
}

/// Everything the automaton builder needs from a parsed expression.
///
/// Position `p` owns rule `rules[p - 1]`; the last position is the endmarker.
#[derive(Debug, Clone)]
pub struct Metadata {
    root_first: PositionSet,
    follow: HashMap<Position, PositionSet>,
    rules: Vec<Rule>,
}

impl Metadata {
    /// Parse an expression and compute its position metadata.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        Self::parse_chars(source.chars())
    }

    /// Parse an expression from a character stream.
    pub fn parse_chars(source: impl IntoIterator<Item = char>) -> Result<Self, ParseError> {
        let mut builder = Builder::default();
        let expr = builder.parse(source)?;

        let end = builder.leaf(Some(END_MARKER), String::new());
        let root = builder.concat(expr, end);
        let root_first = builder.nodes[root.0 as usize].first.clone();

        log::debug!(
            "parsed {} positions ({} arena nodes), root first {}",
            builder.rules.len(),
            builder.nodes.len(),
            root_first
        );

        Ok(Self {
            root_first,
            follow: builder.follow,
            rules: builder.rules,
        })
    }

    /// Positions that can start a match of the whole expression.
    pub fn root_first(&self) -> &PositionSet {
        &self.root_first
    }

    /// Positions reachable in one step from `position`, if any.
    pub fn follow(&self, position: Position) -> Option<&PositionSet> {
        self.follow.get(&position)
    }

    pub fn rule(&self, position: Position) -> Option<&Rule> {
        let idx = (position as usize).checked_sub(1)?;
        self.rules.get(idx)
    }

    /// All rules with their positions, in position order.
    pub fn rules(&self) -> impl Iterator<Item = (Position, &Rule)> + '_ {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, r)| (i as Position + 1, r))
    }

    /// Number of positions, the endmarker included.
    pub fn position_count(&self) -> usize {
        self.rules.len()
    }

    /// Position of the endmarker. A position set containing it accepts.
    pub fn final_position(&self) -> Position {
        self.rules.len() as Position
    }

    /// Distinct rules in position order, without the endmarker.
    pub fn alphabet(&self) -> Vec<&Rule> {
        let end = self.final_position();
        let mut alphabet: Vec<&Rule> = Vec::new();
        for (position, rule) in self.rules() {
            if position != end && !alphabet.contains(&rule) {
                alphabet.push(rule);
            }
        }
        alphabet
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "root first: {}", self.root_first)?;
        for (position, rule) in self.rules() {
            write!(f, "{position:>4}  {rule}")?;
            if position == self.final_position() {
                write!(f, "  (end)")?;
            }
            match self.follow(position) {
                Some(follow) => writeln!(f, "  follow {follow}")?,
                None => writeln!(f)?,
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct Builder {
    nodes: Vec<Node>,
    follow: HashMap<Position, PositionSet>,
    rules: Vec<Rule>,
}

impl Builder {
    /// Run the shift-reduce scan and return the root of the expression
    /// (without the endmarker).
    fn parse(&mut self, source: impl IntoIterator<Item = char>) -> Result<NodeId, ParseError> {
        let mut chars = source.into_iter().enumerate();
        let mut operands: Vec<NodeId> = Vec::new();
        let mut operators: Vec<(Pending, usize)> = Vec::new();
        // True when the next token has to start an operand.
        let mut expect_operand = true;
        let mut length = 0;

        while let Some((offset, c)) = chars.next() {
            length = offset + 1;
            match c {
                '<' => {
                    if !expect_operand {
                        return Err(ParseError::MissingOperator { offset });
                    }
                    let (input, output) = read_atom(&mut chars, offset)?;
                    length = offset + input.len() + output.chars().count() + 3;
                    let node = self.atom(&input, output);
                    operands.push(node);
                    expect_operand = false;
                }
                '(' => {
                    if !expect_operand {
                        return Err(ParseError::MissingOperator { offset });
                    }
                    operators.push((Pending::Open, offset));
                }
                '+' | '.' => {
                    if expect_operand {
                        return Err(ParseError::MissingOperand { operator: c, offset });
                    }
                    let op = if c == '+' { Binary::Union } else { Binary::Concat };
                    operators.push((Pending::Op(op), offset));
                    expect_operand = true;
                }
                ')' => {
                    if expect_operand {
                        return Err(ParseError::MissingOperand { operator: c, offset });
                    }
                    loop {
                        match operators.pop() {
                            None => return Err(ParseError::UnmatchedClose { offset }),
                            Some((Pending::Open, _)) => break,
                            Some((Pending::Op(op), at)) => self.reduce(&mut operands, op, at)?,
                        }
                    }
                }
                '*' => {
                    if expect_operand {
                        return Err(ParseError::MissingOperand { operator: c, offset });
                    }
                    let Some(child) = operands.pop() else {
                        return Err(ParseError::MissingOperand { operator: c, offset });
                    };
                    let node = self.node(NodeKind::Star(child));
                    operands.push(node);
                }
                c if c.is_whitespace() => {}
                found => return Err(ParseError::UnexpectedChar { found, offset }),
            }
        }

        if expect_operand {
            return Err(match operators.last() {
                Some(&(Pending::Open, offset)) => ParseError::UnclosedOpen { offset },
                Some(&(pending, offset)) => ParseError::MissingOperand {
                    operator: pending.symbol(),
                    offset,
                },
                None => ParseError::Empty,
            });
        }

        // Remaining operators reduce in stack-pop order.
        while let Some((pending, at)) = operators.pop() {
            match pending {
                Pending::Open => return Err(ParseError::UnclosedOpen { offset: at }),
                Pending::Op(op) => self.reduce(&mut operands, op, at)?,
            }
        }

        match operands.as_slice() {
            [root] => Ok(*root),
            [] => Err(ParseError::Empty),
            _ => Err(ParseError::MissingOperator { offset: length }),
        }
    }

    /// Pop two operands and push the binary node for `op`.
    fn reduce(
        &mut self,
        operands: &mut Vec<NodeId>,
        op: Binary,
        offset: usize,
    ) -> Result<(), ParseError> {
        let (Some(right), Some(left)) = (operands.pop(), operands.pop()) else {
            return Err(ParseError::MissingOperand {
                operator: Pending::Op(op).symbol(),
                offset,
            });
        };
        let node = match op {
            Binary::Union => self.node(NodeKind::Union(left, right)),
            Binary::Concat => self.concat(left, right),
        };
        operands.push(node);
        Ok(())
    }

    /// Desugar `<abc,out>` into `<a,out>.<b,>.<c,>`, left-associated.
    fn atom(&mut self, input: &[char], output: String) -> NodeId {
        let mut chars = input.iter().copied();
        let mut node = self.leaf(chars.next(), output);
        for c in chars {
            let right = self.leaf(Some(c), String::new());
            node = self.concat(node, right);
        }
        node
    }

    fn leaf(&mut self, input: Option<char>, output: String) -> NodeId {
        self.rules.push(Rule { input, output });
        let position = self.rules.len() as Position;
        self.node(NodeKind::Leaf(position))
    }

    fn concat(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.node(NodeKind::Concat(left, right))
    }

    /// Build a node from already annotated children, recording its
    /// nullable/first/last data and the follow edges it introduces.
    fn node(&mut self, kind: NodeKind) -> NodeId {
        let node = match kind {
            NodeKind::Leaf(position) => Node {
                nullable: self.rules[position as usize - 1].is_empty(),
                first: PositionSet::singleton(position),
                last: PositionSet::singleton(position),
            },
            NodeKind::Star(child) => {
                let c = &self.nodes[child.0 as usize];
                let first = c.first.clone();
                let last = c.last.clone();
                // Loop back from every last position to the first set.
                for p in last.iter() {
                    self.extend_follow(p, &first);
                }
                Node {
                    nullable: true,
                    first,
                    last,
                }
            }
            NodeKind::Union(left, right) => {
                let (l, r) = (&self.nodes[left.0 as usize], &self.nodes[right.0 as usize]);
                Node {
                    nullable: l.nullable || r.nullable,
                    first: l.first.union(Some(&r.first)),
                    last: l.last.union(Some(&r.last)),
                }
            }
            NodeKind::Concat(left, right) => {
                let (l, r) = (&self.nodes[left.0 as usize], &self.nodes[right.0 as usize]);
                let node = Node {
                    nullable: l.nullable && r.nullable,
                    first: if l.nullable {
                        l.first.union(Some(&r.first))
                    } else {
                        l.first.clone()
                    },
                    last: if r.nullable {
                        l.last.union(Some(&r.last))
                    } else {
                        r.last.clone()
                    },
                };
                let left_last = l.last.clone();
                let right_first = r.first.clone();
                for p in left_last.iter() {
                    self.extend_follow(p, &right_first);
                }
                node
            }
        };

        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn extend_follow(&mut self, position: Position, with: &PositionSet) {
        let merged = with.union(self.follow.get(&position));
        self.follow.insert(position, merged);
    }
}

/// Read the body of an atom after its opening `<`.
///
/// The input tape runs to the first `,`, the output tape to the first `>`.
fn read_atom(
    chars: &mut impl Iterator<Item = (usize, char)>,
    start: usize,
) -> Result<(Vec<char>, String), ParseError> {
    let mut input = Vec::new();
    loop {
        match chars.next() {
            Some((_, ',')) => break,
            Some((_, '>')) => return Err(ParseError::MissingSeparator { start }),
            Some((_, c)) => input.push(c),
            None => {
                return Err(ParseError::UnterminatedAtom {
                    start,
                    expected: ',',
                });
            }
        }
    }

    let mut output = String::new();
    loop {
        match chars.next() {
            Some((_, '>')) => break,
            Some((_, c)) => output.push(c),
            None => {
                return Err(ParseError::UnterminatedAtom {
                    start,
                    expected: '>',
                });
            }
        }
    }

    Ok((input, output))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOOP_EXPR: &str = "(<a,>+<b,>)*.<a,>.<b,>.<b,>";
    const MULTICHAR_EXPR: &str = "<abc,xy>+<bca,zz>";

    fn set(members: &[Position]) -> PositionSet {
        PositionSet::new(members.iter().copied())
    }

    #[test]
    fn root_first() {
        let meta = Metadata::parse(LOOP_EXPR).unwrap();
        assert_eq!(meta.root_first(), &set(&[1, 2, 3]));
    }

    #[test]
    fn follow_sets() {
        let meta = Metadata::parse(LOOP_EXPR).unwrap();
        assert_eq!(meta.follow(1), Some(&set(&[1, 2, 3])));
        assert_eq!(meta.follow(2), Some(&set(&[1, 2, 3])));
        assert_eq!(meta.follow(3), Some(&set(&[4])));
        assert_eq!(meta.follow(4), Some(&set(&[5])));
        assert_eq!(meta.follow(5), Some(&set(&[6])));
        assert_eq!(meta.follow(6), None);
    }

    #[test]
    fn rules_and_final_position() {
        let meta = Metadata::parse(LOOP_EXPR).unwrap();
        assert_eq!(meta.position_count(), 6);
        assert_eq!(meta.final_position(), 6);
        assert!(meta.rule(1).unwrap().matches('a', ""));
        assert!(meta.rule(2).unwrap().matches('b', ""));
        assert!(meta.rule(6).unwrap().matches(END_MARKER, ""));
        assert!(meta.rule(0).is_none());
        assert!(meta.rule(7).is_none());
    }

    #[test]
    fn identical_atoms_keep_distinct_positions() {
        let meta = Metadata::parse(LOOP_EXPR).unwrap();
        assert_eq!(meta.rule(1), meta.rule(3));
        assert_eq!(meta.alphabet().len(), 2);
    }

    #[test]
    fn multichar_follow() {
        let meta = Metadata::parse(MULTICHAR_EXPR).unwrap();
        assert_eq!(meta.position_count(), 7);
        assert_eq!(meta.follow(1), Some(&set(&[2])));
        assert_eq!(meta.follow(2), Some(&set(&[3])));
        assert_eq!(meta.follow(3), Some(&set(&[7])));
        assert_eq!(meta.follow(4), Some(&set(&[5])));
        assert_eq!(meta.follow(5), Some(&set(&[6])));
        assert_eq!(meta.follow(6), Some(&set(&[7])));
        assert_eq!(meta.follow(7), None);
    }

    #[test]
    fn multichar_root_first() {
        let meta = Metadata::parse(MULTICHAR_EXPR).unwrap();
        assert_eq!(meta.root_first(), &set(&[1, 4]));
    }

    #[test]
    fn multichar_output_on_first_char_only() {
        let meta = Metadata::parse(MULTICHAR_EXPR).unwrap();
        let expected = [
            ('a', "xy"),
            ('b', ""),
            ('c', ""),
            ('b', "zz"),
            ('a', ""),
        ];
        let alphabet = meta.alphabet();
        assert_eq!(alphabet.len(), expected.len());
        for (rule, (input, output)) in alphabet.iter().zip(expected) {
            assert!(rule.matches(input, output), "{rule} != <{input},{output}>");
        }
    }

    #[test]
    fn nullable_atom_joins_first_set() {
        // (<,>+<a,x>).<b,y>: the empty branch lets <b,y> start the match.
        let meta = Metadata::parse("(<,>+<a,x>).<b,y>").unwrap();
        assert_eq!(meta.root_first(), &set(&[1, 2, 3]));
        assert_eq!(meta.follow(1), Some(&set(&[3])));
        assert_eq!(meta.follow(2), Some(&set(&[3])));
        assert_eq!(meta.follow(3), Some(&set(&[4])));
    }

    #[test]
    fn star_makes_expression_nullable() {
        let meta = Metadata::parse("<a,b>*").unwrap();
        assert_eq!(meta.root_first(), &set(&[1, 2]));
        assert_eq!(meta.follow(1), Some(&set(&[1, 2])));
    }

    #[test]
    fn operators_reduce_in_stack_order() {
        // No precedence between `.` and `+`: the trailing operators reduce
        // right to left, so this reads <a,x>.(<b,y>+<c,z>).
        let meta = Metadata::parse("<a,x>.<b,y>+<c,z>").unwrap();
        assert_eq!(meta.root_first(), &set(&[1]));
        assert_eq!(meta.follow(1), Some(&set(&[2, 3])));
        assert_eq!(meta.follow(2), Some(&set(&[4])));
        assert_eq!(meta.follow(3), Some(&set(&[4])));
    }

    #[test]
    fn output_may_contain_comma() {
        let meta = Metadata::parse("<a,x,y>").unwrap();
        assert!(meta.rule(1).unwrap().matches('a', "x,y"));
    }

    #[test]
    fn whitespace_is_ignored() {
        let spaced = Metadata::parse(" ( <a,> + <b,> ) * . <a,>\n.<b,>.<b,> ").unwrap();
        let plain = Metadata::parse(LOOP_EXPR).unwrap();
        assert_eq!(spaced.root_first(), plain.root_first());
        for p in 1..=6 {
            assert_eq!(spaced.follow(p), plain.follow(p));
        }
    }

    #[test]
    fn unterminated_atom() {
        assert_eq!(
            Metadata::parse("<ab").unwrap_err(),
            ParseError::UnterminatedAtom {
                start: 0,
                expected: ','
            }
        );
        assert_eq!(
            Metadata::parse("<a,b>+<c,d").unwrap_err(),
            ParseError::UnterminatedAtom {
                start: 6,
                expected: '>'
            }
        );
        assert_eq!(
            Metadata::parse("<ab>").unwrap_err(),
            ParseError::MissingSeparator { start: 0 }
        );
    }

    #[test]
    fn unbalanced_parentheses() {
        assert_eq!(
            Metadata::parse("<a,b>)").unwrap_err(),
            ParseError::UnmatchedClose { offset: 5 }
        );
        assert_eq!(
            Metadata::parse("(<a,b>").unwrap_err(),
            ParseError::UnclosedOpen { offset: 0 }
        );
        assert_eq!(
            Metadata::parse("(").unwrap_err(),
            ParseError::UnclosedOpen { offset: 0 }
        );
    }

    #[test]
    fn missing_operands_and_operators() {
        assert_eq!(
            Metadata::parse("+<a,b>").unwrap_err(),
            ParseError::MissingOperand {
                operator: '+',
                offset: 0
            }
        );
        assert_eq!(
            Metadata::parse("<a,b>.").unwrap_err(),
            ParseError::MissingOperand {
                operator: '.',
                offset: 5
            }
        );
        assert_eq!(
            Metadata::parse("*").unwrap_err(),
            ParseError::MissingOperand {
                operator: '*',
                offset: 0
            }
        );
        assert_eq!(
            Metadata::parse("()").unwrap_err(),
            ParseError::MissingOperand {
                operator: ')',
                offset: 1
            }
        );
        assert_eq!(
            Metadata::parse("<a,b><c,d>").unwrap_err(),
            ParseError::MissingOperator { offset: 5 }
        );
    }

    #[test]
    fn empty_and_stray_input() {
        assert_eq!(Metadata::parse("").unwrap_err(), ParseError::Empty);
        assert_eq!(Metadata::parse("  \n").unwrap_err(), ParseError::Empty);
        assert_eq!(
            Metadata::parse("<a,b>|<c,d>").unwrap_err(),
            ParseError::UnexpectedChar {
                found: '|',
                offset: 5
            }
        );
    }
}
