//! `ova.xml` manifest generation.
//!
//! The manifest describes the exported object graph (VM, VBDs, VDIs,
//! SR) as structured text. It is rendered by substituting named
//! placeholders into fixed per-class templates and concatenating the
//! fragments inside one wrapper template. Rendering is pure string
//! formatting: nothing here parses the result or validates it against a
//! schema, and the whole template set can be swapped out.

use crate::ids::IdAllocation;

/// Display metadata for one disk, in insertion order.
#[derive(Debug, Clone)]
pub struct DiskMeta {
    /// Caller-supplied disk key, used as the VDI name label.
    pub name: String,
    /// Virtual size of the disk in bytes.
    pub virtual_size: u64,
}

/// Named-placeholder templates for the manifest fragments.
///
/// Placeholders are written `{field}` and substituted literally; a
/// placeholder a template does not mention is simply skipped. The
/// defaults render the XVA `ova.xml` dialect.
#[derive(Debug, Clone)]
pub struct ManifestTemplates {
    /// Top-level wrapper. Fields: `{objects}`.
    pub wrapper: String,
    /// VM fragment. Fields: `{id}`, `{uuid}`, `{name}`, `{vbd_refs}`.
    pub vm: String,
    /// VBD fragment. Fields: `{id}`, `{uuid}`, `{vm}`, `{vdi}`, `{device}`.
    pub vbd: String,
    /// VDI fragment. Fields: `{id}`, `{uuid}`, `{name}`, `{sr}`, `{vbd}`, `{size}`.
    pub vdi: String,
    /// SR fragment. Fields: `{id}`, `{uuid}`, `{name}`, `{vdi_refs}`.
    pub sr: String,
    /// One item of a reference list. Fields: `{ref}`.
    pub reference: String,
}

impl Default for ManifestTemplates {
    fn default() -> Self {
        Self {
            wrapper: WRAPPER_TEMPLATE.to_string(),
            vm: VM_TEMPLATE.to_string(),
            vbd: VBD_TEMPLATE.to_string(),
            vdi: VDI_TEMPLATE.to_string(),
            sr: SR_TEMPLATE.to_string(),
            reference: REFERENCE_TEMPLATE.to_string(),
        }
    }
}

const WRAPPER_TEMPLATE: &str = "\
<value><struct>
<member><name>version</name><value><struct>
<member><name>export_vsn</name><value>2</value></member>
</struct></value></member>
<member><name>objects</name><value><array><data>
{objects}</data></array></value></member>
</struct></value>
";

const VM_TEMPLATE: &str = "\
<value><struct>
<member><name>class</name><value>VM</value></member>
<member><name>id</name><value>{id}</value></member>
<member><name>snapshot</name><value><struct>
<member><name>uuid</name><value>{uuid}</value></member>
<member><name>name_label</name><value>{name}</value></member>
<member><name>VBDs</name><value><array><data>{vbd_refs}</data></array></value></member>
</struct></value></member>
</struct></value>
";

const VBD_TEMPLATE: &str = "\
<value><struct>
<member><name>class</name><value>VBD</value></member>
<member><name>id</name><value>{id}</value></member>
<member><name>snapshot</name><value><struct>
<member><name>uuid</name><value>{uuid}</value></member>
<member><name>VM</name><value>{vm}</value></member>
<member><name>VDI</name><value>{vdi}</value></member>
<member><name>userdevice</name><value>{device}</value></member>
<member><name>type</name><value>Disk</value></member>
<member><name>mode</name><value>RW</value></member>
</struct></value></member>
</struct></value>
";

const VDI_TEMPLATE: &str = "\
<value><struct>
<member><name>class</name><value>VDI</value></member>
<member><name>id</name><value>{id}</value></member>
<member><name>snapshot</name><value><struct>
<member><name>uuid</name><value>{uuid}</value></member>
<member><name>name_label</name><value>{name}</value></member>
<member><name>SR</name><value>{sr}</value></member>
<member><name>VBDs</name><value><array><data><value>{vbd}</value></data></array></value></member>
<member><name>virtual_size</name><value>{size}</value></member>
<member><name>type</name><value>user</value></member>
</struct></value></member>
</struct></value>
";

const SR_TEMPLATE: &str = "\
<value><struct>
<member><name>class</name><value>SR</value></member>
<member><name>id</name><value>{id}</value></member>
<member><name>snapshot</name><value><struct>
<member><name>uuid</name><value>{uuid}</value></member>
<member><name>name_label</name><value>{name}</value></member>
<member><name>VDIs</name><value><array><data>{vdi_refs}</data></array></value></member>
<member><name>type</name><value>user</value></member>
</struct></value></member>
</struct></value>
";

const REFERENCE_TEMPLATE: &str = "<value>{ref}</value>";

/// Substitute `{name}` placeholders with their values.
fn render(template: &str, fields: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in fields {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

/// A rendered manifest plus the VDI id per disk, in insertion order.
///
/// The VDI ids are what chunk emission uses to name `Ref:<id>/<index>`
/// entries; they come from the same allocation the manifest text was
/// rendered from.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Complete manifest text.
    pub text: String,
    /// VDI id per disk, indexed by disk insertion order.
    pub vdi_ids: Vec<u32>,
}

/// Render the manifest for one export.
///
/// `ids` must have been allocated for exactly `disks.len()` disks.
pub fn generate_manifest(
    templates: &ManifestTemplates,
    ids: &IdAllocation,
    vm_name: &str,
    disks: &[DiskMeta],
) -> Manifest {
    debug_assert_eq!(ids.vdis.len(), disks.len());

    let render_refs = |entities: &[crate::ids::EntityIds]| -> String {
        entities
            .iter()
            .map(|e| render(&templates.reference, &[("ref", e.reference().as_str())]))
            .collect()
    };
    let vbd_refs = render_refs(&ids.vbds);
    let vdi_refs = render_refs(&ids.vdis);

    let mut objects = String::new();

    objects.push_str(&render(
        &templates.vm,
        &[
            ("id", ids.vm.reference().as_str()),
            ("uuid", ids.vm.uuid.to_string().as_str()),
            ("name", vm_name),
            ("vbd_refs", vbd_refs.as_str()),
        ],
    ));

    for (i, vbd) in ids.vbds.iter().enumerate() {
        objects.push_str(&render(
            &templates.vbd,
            &[
                ("id", vbd.reference().as_str()),
                ("uuid", vbd.uuid.to_string().as_str()),
                ("vm", ids.vm.reference().as_str()),
                ("vdi", ids.vdis[i].reference().as_str()),
                ("device", i.to_string().as_str()),
            ],
        ));
    }

    for (i, vdi) in ids.vdis.iter().enumerate() {
        objects.push_str(&render(
            &templates.vdi,
            &[
                ("id", vdi.reference().as_str()),
                ("uuid", vdi.uuid.to_string().as_str()),
                ("name", disks[i].name.as_str()),
                ("sr", ids.sr.reference().as_str()),
                ("vbd", ids.vbds[i].reference().as_str()),
                ("size", disks[i].virtual_size.to_string().as_str()),
            ],
        ));
    }

    objects.push_str(&render(
        &templates.sr,
        &[
            ("id", ids.sr.reference().as_str()),
            ("uuid", ids.sr.uuid.to_string().as_str()),
            ("name", "SR"),
            ("vdi_refs", vdi_refs.as_str()),
        ],
    ));

    Manifest {
        text: render(&templates.wrapper, &[("objects", objects.as_str())]),
        vdi_ids: ids.vdi_ids(),
    }
}
