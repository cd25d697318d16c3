// レイヤー画像XObjectの構築、SMask参照、コンテンツストリーム組立

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, dictionary};
use tracing::debug;

use super::DocumentSink;
use crate::error::LayerError;
use crate::geometry::projection::{CanvasSize, Placement};
use crate::layers::EncodedImage;

/// 配置済みレイヤー画像からPDFを構築する。
pub struct PdfPageWriter {
    doc: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    current: Option<OpenPage>,
}

/// 組立中のページ。
struct OpenPage {
    canvas: CanvasSize,
    xobjects: Dictionary,
    content: Vec<u8>,
}

impl PdfPageWriter {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            kids: Vec::new(),
            current: None,
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    /// SMask用のアルファXObjectを追加する。
    ///
    /// 戻り値はXObjectのオブジェクトID。
    fn add_smask_xobject(&mut self, alpha_flate: &[u8], width: u32, height: u32) -> ObjectId {
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
            "Filter" => "FlateDecode",
        };
        let stream = Stream::new(dict, alpha_flate.to_vec());
        self.doc.add_object(Object::Stream(stream))
    }

    /// レイヤー画像XObjectを追加する（アルファがあればSMaskを参照）。
    ///
    /// 戻り値はXObjectのオブジェクトID。
    pub fn add_image_xobject(&mut self, image: &EncodedImage) -> ObjectId {
        let smask_id = image
            .smask
            .as_ref()
            .map(|alpha| self.add_smask_xobject(alpha, image.width, image.height));

        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => image.filter.pdf_name(),
        };
        if let Some(id) = smask_id {
            dict.set("SMask", Object::Reference(id));
        }
        let stream = Stream::new(dict, image.data.clone());
        self.doc.add_object(Object::Stream(stream))
    }

    /// 画像1枚を配置するコンテンツストリーム片を生成する。
    ///
    /// `placement` は左上原点のキャンバス座標。PDFは左下原点なのでY軸を反転する:
    /// `q <w> 0 0 <h> <x> <canvas_h - y - h> cm /<name> Do Q`
    pub fn build_draw_command(name: &str, placement: &Placement, canvas_height: f64) -> String {
        let pdf_y = canvas_height - placement.y - placement.height;
        format!(
            "q {:.4} 0 0 {:.4} {:.4} {:.4} cm /{} Do Q\n",
            placement.width, placement.height, placement.x, pdf_y, name
        )
    }

    fn open_page(&mut self) -> crate::error::Result<&mut OpenPage> {
        self.current
            .as_mut()
            .ok_or_else(|| LayerError::sink("no page is open"))
    }

    /// ページツリーとCatalogを確定し、PDFをバイト列として出力する。
    pub fn finish(mut self) -> crate::error::Result<Vec<u8>> {
        if self.current.is_some() {
            return Err(LayerError::sink("cannot finish with a page still open"));
        }
        if self.kids.is_empty() {
            return Err(LayerError::sink("document has no pages"));
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Count" => self.kids.len() as i64,
            "Kids" => std::mem::take(&mut self.kids),
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| LayerError::sink(e.to_string()))?;
        Ok(buf)
    }
}

impl Default for PdfPageWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentSink for PdfPageWriter {
    fn begin_page(&mut self, canvas: CanvasSize) -> crate::error::Result<()> {
        if self.current.is_some() {
            return Err(LayerError::sink("previous page was not ended"));
        }
        self.current = Some(OpenPage {
            canvas,
            xobjects: Dictionary::new(),
            content: Vec::new(),
        });
        Ok(())
    }

    fn draw_image(
        &mut self,
        placement: &Placement,
        image: &EncodedImage,
    ) -> crate::error::Result<()> {
        if image.width == 0 || image.height == 0 {
            return Err(LayerError::sink(format!(
                "cannot draw an empty {}x{} image",
                image.width, image.height
            )));
        }
        self.open_page()?;

        let image_id = self.add_image_xobject(image);
        let page = self.open_page()?;
        let name = format!("Im{}", page.xobjects.len());
        let command = Self::build_draw_command(&name, placement, page.canvas.height);
        page.content.extend_from_slice(command.as_bytes());
        page.xobjects.set(name.as_bytes(), Object::Reference(image_id));

        debug!(
            name = %name,
            x = placement.x,
            y = placement.y,
            width = placement.width,
            height = placement.height,
            bytes = image.byte_len(),
            "draw_image"
        );
        Ok(())
    }

    fn end_page(&mut self) -> crate::error::Result<()> {
        let page = self
            .current
            .take()
            .ok_or_else(|| LayerError::sink("no page is open"))?;

        let resources_id = self.doc.add_object(dictionary! {
            "XObject" => Object::Dictionary(page.xobjects),
        });
        let content_id = self
            .doc
            .add_object(Object::Stream(Stream::new(dictionary! {}, page.content)));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page.canvas.width as f32),
                Object::Real(page.canvas.height as f32),
            ],
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        self.kids.push(page_id.into());
        Ok(())
    }
}
