//! Staff tree traversal.
//!
//! Both walks are depth-first and post-order: a member's reports are visited
//! before the member itself. The visitor receives the member and its
//! ancestors, root first, excluding the member.

use super::model::{Person, StaffMember};

/// Walk `staff`, rebuilding a filtered copy of the tree.
///
/// A member is kept when `visit` returns `true` for it or when any of its
/// descendants is kept. Kept members without kept reports have no `staff`
/// list. The input tree is left untouched.
pub fn traverse_staff<F>(staff: &[StaffMember], mut visit: F) -> Vec<StaffMember>
where
    F: FnMut(&StaffMember, &[&StaffMember]) -> bool,
{
    let mut ancestors = Vec::new();
    retain(staff, &mut ancestors, &mut visit)
}

fn retain<'a, F>(
    staff: &'a [StaffMember],
    ancestors: &mut Vec<&'a StaffMember>,
    visit: &mut F,
) -> Vec<StaffMember>
where
    F: FnMut(&StaffMember, &[&StaffMember]) -> bool,
{
    let mut kept = Vec::new();
    for member in staff {
        ancestors.push(member);
        let reports = retain(member.reports(), ancestors, visit);
        ancestors.pop();

        if visit(member, ancestors) || !reports.is_empty() {
            kept.push(StaffMember {
                person: member.person.clone(),
                staff: (!reports.is_empty()).then_some(reports),
            });
        }
    }
    kept
}

/// Walk `staff` without building a copy.
pub fn visit_staff<'a, F>(staff: &'a [StaffMember], mut visit: F)
where
    F: FnMut(&'a StaffMember, &[&'a StaffMember]),
{
    fn walk<'a, F>(staff: &'a [StaffMember], ancestors: &mut Vec<&'a StaffMember>, visit: &mut F)
    where
        F: FnMut(&'a StaffMember, &[&'a StaffMember]),
    {
        for member in staff {
            ancestors.push(member);
            walk(member.reports(), ancestors, visit);
            ancestors.pop();
            visit(member, ancestors);
        }
    }

    let mut ancestors = Vec::new();
    walk(staff, &mut ancestors, &mut visit);
}

/// Find `person` in `people` by value identity (name and team).
pub fn find_person_by_value<'a>(people: &'a [Person], person: &Person) -> Option<&'a Person> {
    people.iter().find(|candidate| candidate.same_person(person))
}

/// Keep only the members linked to an accented or noteworthy person, plus
/// their chains of managers.
pub fn prune_staff(
    staff: &[StaffMember],
    accented: &[Person],
    noteworthy: &[Person],
) -> Vec<StaffMember> {
    traverse_staff(staff, |member, _| {
        find_person_by_value(accented, &member.person).is_some()
            || find_person_by_value(noteworthy, &member.person).is_some()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(name: &str, reports: Vec<StaffMember>) -> StaffMember {
        let member = StaffMember::new(Person::new(name, "Team"));
        if reports.is_empty() {
            member
        } else {
            member.with_staff(reports)
        }
    }

    fn names(staff: &[StaffMember]) -> Vec<String> {
        let mut out = Vec::new();
        visit_staff(staff, |member, _| out.push(member.person.name.clone()));
        out
    }

    fn tree() -> Vec<StaffMember> {
        vec![member(
            "ceo",
            vec![
                member(
                    "vp",
                    vec![
                        member("dir", vec![member("eng", vec![]), member("qa", vec![])]),
                        member("ops", vec![]),
                    ],
                ),
                member("cfo", vec![member("acct", vec![])]),
            ],
        )]
    }

    #[test]
    fn visits_post_order_with_ancestors() {
        let mut seen = Vec::new();
        visit_staff(&tree(), |member, ancestors| {
            let path: Vec<&str> = ancestors.iter().map(|m| m.person.name.as_str()).collect();
            seen.push(format!("{}<{}", member.person.name, path.join("/")));
        });
        assert_eq!(
            seen,
            [
                "eng<ceo/vp/dir",
                "qa<ceo/vp/dir",
                "dir<ceo/vp",
                "ops<ceo/vp",
                "vp<ceo",
                "acct<ceo/cfo",
                "cfo<ceo",
                "ceo<",
            ]
        );
    }

    #[test]
    fn pruning_keeps_the_path_to_a_marked_leaf() {
        let staff = tree();
        let accented = [Person::new("eng", "Team")];
        let pruned = prune_staff(&staff, &accented, &[]);

        assert_eq!(names(&pruned), ["eng", "dir", "vp", "ceo"]);
        // Input is not modified.
        assert_eq!(names(&staff).len(), 8);
        // The kept leaf has no staff list.
        let dir = &pruned[0].reports()[0].reports()[0];
        assert!(dir.reports()[0].staff.is_none());
    }

    #[test]
    fn pruning_matches_on_team_too() {
        let pruned = prune_staff(&tree(), &[Person::new("eng", "Other")], &[]);
        assert!(pruned.is_empty());
    }

    #[test]
    fn noteworthy_people_are_kept() {
        let pruned = prune_staff(&tree(), &[], &[Person::new("cfo", "Team")]);
        assert_eq!(names(&pruned), ["cfo", "ceo"]);
        assert!(pruned[0].reports()[0].is_leaf());
    }

    #[test]
    fn keeping_everything_reproduces_the_tree() {
        let staff = tree();
        assert_eq!(traverse_staff(&staff, |_, _| true), staff);
    }

    #[test]
    fn find_person_by_value_ignores_other_fields() {
        let people = [Person::new("Ada", "Eng").with_title("Lead")];
        assert!(find_person_by_value(&people, &Person::new("Ada", "Eng")).is_some());
        assert!(find_person_by_value(&people, &Person::new("Ada", "Ops")).is_none());
    }
}
