use markup5ever::{Attribute, ExpandedName, QualName};

/// Mutable view over one element's attribute list, keyed by expanded name.
/// Covers exactly what tag rewriting needs: read, overwrite-or-add, remove.
pub struct Attrs<'a> {
  attributes: &'a mut Vec<Attribute>,
}

impl<'a> Attrs<'a> {
  pub fn new(attributes: &'a mut Vec<Attribute>) -> Self {
    Self { attributes }
  }

  pub fn get(&self, name: ExpandedName) -> Option<&str> {
    self
      .attributes
      .iter()
      .find(|attribute| attribute.name.expanded() == name)
      .map(|attribute| &*attribute.value)
  }

  pub fn set(&mut self, name: ExpandedName, value: &str) {
    match self
      .attributes
      .iter_mut()
      .find(|attribute| attribute.name.expanded() == name)
    {
      Some(attribute) => attribute.value = value.into(),
      None => self.attributes.push(Attribute {
        name: QualName::new(None, name.ns.clone(), name.local.clone()),
        value: value.into(),
      }),
    }
  }

  pub fn delete(&mut self, name: ExpandedName) {
    self
      .attributes
      .retain(|attribute| attribute.name.expanded() != name);
  }
}

#[cfg(test)]
mod tests {
  use markup5ever::{expanded_name, local_name, namespace_url, ns, LocalName};
  use pretty_assertions::assert_eq;

  use super::*;

  fn attribute(local: LocalName, value: &str) -> Attribute {
    Attribute {
      name: QualName::new(None, ns!(), local),
      value: value.into(),
    }
  }

  #[test]
  fn get_finds_by_expanded_name() {
    let mut attributes = vec![attribute(local_name!("href"), "/css/a.css")];
    let attrs = Attrs::new(&mut attributes);

    assert_eq!(attrs.get(expanded_name!("", "href")), Some("/css/a.css"));
    assert_eq!(attrs.get(expanded_name!("", "integrity")), None);
  }

  #[test]
  fn set_overwrites_an_existing_attribute_in_place() {
    let mut attributes = vec![attribute(local_name!("src"), "/js/app.js")];
    let mut attrs = Attrs::new(&mut attributes);

    attrs.set(expanded_name!("", "src"), "/concatenated/abc.js");

    assert_eq!(attributes.len(), 1);
    assert_eq!(&*attributes[0].value, "/concatenated/abc.js");
  }

  #[test]
  fn set_appends_a_missing_attribute() {
    let mut attributes = vec![attribute(local_name!("rel"), "stylesheet")];
    let mut attrs = Attrs::new(&mut attributes);

    attrs.set(expanded_name!("", "disabled"), "");

    assert_eq!(attributes.len(), 2);
    assert_eq!(&*attributes[1].name.local, "disabled");
  }

  #[test]
  fn delete_removes_every_occurrence() {
    let mut attributes = vec![
      attribute(local_name!("href"), "/css/a.css"),
      attribute(local_name!("integrity"), "sha256-aaaa"),
    ];
    let mut attrs = Attrs::new(&mut attributes);

    attrs.delete(expanded_name!("", "integrity"));

    assert_eq!(attributes.len(), 1);
    assert_eq!(&*attributes[0].name.local, "href");
  }
}
