//! Common test fixtures: capabilities documents and persisted envelopes.

/// Capabilities documents as served by real WMS/WMTS endpoints.
pub mod capabilities {
    /// WMTS 1.0.0 with two layers and two matrix sets.
    ///
    /// The Web Mercator matrices are deliberately listed out of zoom order.
    pub const WMTS_BASIC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Capabilities xmlns="http://www.opengis.net/wmts/1.0"
    xmlns:ows="http://www.opengis.net/ows/1.1"
    xmlns:xlink="http://www.w3.org/1999/xlink"
    version="1.0.0">
  <ows:ServiceIdentification>
    <ows:Title>Demo Tiles</ows:Title>
    <ows:Abstract>Orthophotos &amp; topography</ows:Abstract>
    <ows:Keywords>
      <ows:Keyword>imagery</ows:Keyword>
      <ows:Keyword>basemap</ows:Keyword>
    </ows:Keywords>
    <ows:ServiceType>OGC WMTS</ows:ServiceType>
    <ows:ServiceTypeVersion>1.0.0</ows:ServiceTypeVersion>
  </ows:ServiceIdentification>
  <ows:OperationsMetadata>
    <ows:Operation name="GetCapabilities">
      <ows:DCP><ows:HTTP><ows:Get xlink:href="https://tiles.example.com/wmts?"/></ows:HTTP></ows:DCP>
    </ows:Operation>
    <ows:Operation name="GetTile">
      <ows:DCP>
        <ows:HTTP>
          <ows:Get xlink:href="https://tiles.example.com/wmts?">
            <ows:Constraint name="GetEncoding">
              <ows:AllowedValues><ows:Value>KVP</ows:Value></ows:AllowedValues>
            </ows:Constraint>
          </ows:Get>
        </ows:HTTP>
      </ows:DCP>
    </ows:Operation>
  </ows:OperationsMetadata>
  <Contents>
    <Layer>
      <ows:Title>Orthophotos</ows:Title>
      <ows:Identifier>ortho</ows:Identifier>
      <ows:WGS84BoundingBox>
        <ows:LowerCorner>-5.5 41.0</ows:LowerCorner>
        <ows:UpperCorner>10.0 51.5</ows:UpperCorner>
      </ows:WGS84BoundingBox>
      <Style isDefault="false">
        <ows:Title>Infrared</ows:Title>
        <ows:Identifier>infrared</ows:Identifier>
      </Style>
      <Style isDefault="true">
        <ows:Title>Natural</ows:Title>
        <ows:Identifier>normal</ows:Identifier>
        <LegendURL format="image/png" xlink:href="https://tiles.example.com/legend/ortho.png"/>
      </Style>
      <Format>image/jpeg</Format>
      <Format>image/png</Format>
      <TileMatrixSetLink><TileMatrixSet>WGS84</TileMatrixSet></TileMatrixSetLink>
      <TileMatrixSetLink><TileMatrixSet>PM</TileMatrixSet></TileMatrixSetLink>
      <Dimension>
        <ows:Identifier>Time</ows:Identifier>
        <ows:UOM>ISO8601</ows:UOM>
        <Default>2024-01-15</Default>
        <Value>2024-01-15</Value>
        <Value>2023-06-01</Value>
      </Dimension>
      <ResourceURL format="image/png" resourceType="FeatureInfo" template="https://tiles.example.com/info/ortho/{TileMatrix}/{TileRow}/{TileCol}/{J}/{I}.xml"/>
      <ResourceURL format="image/jpeg" resourceType="tile" template="https://tiles.example.com/rest/ortho/{Style}/{Time}/{TileMatrixSet}/{TileMatrix}/{TileRow}/{TileCol}.jpg"/>
      <ResourceURL format="image/png" resourceType="tile" template="https://tiles.example.com/rest/ortho/{Style}/{Time}/{TileMatrixSet}/{TileMatrix}/{TileRow}/{TileCol}.png"/>
    </Layer>
    <Layer>
      <ows:Title>Admin boundaries</ows:Title>
      <ows:Identifier>admin</ows:Identifier>
      <Style isDefault="true"><ows:Identifier>default</ows:Identifier></Style>
      <Format>image/png</Format>
      <TileMatrixSetLink><TileMatrixSet>PM</TileMatrixSet></TileMatrixSetLink>
    </Layer>
    <TileMatrixSet>
      <ows:Identifier>PM</ows:Identifier>
      <ows:SupportedCRS>urn:ogc:def:crs:EPSG::3857</ows:SupportedCRS>
      <WellKnownScaleSet>urn:ogc:def:wkss:OGC:1.0:GoogleMapsCompatible</WellKnownScaleSet>
      <TileMatrix>
        <ows:Identifier>1</ows:Identifier>
        <ScaleDenominator>279541132.0143589</ScaleDenominator>
        <TopLeftCorner>-20037508.3427892 20037508.3427892</TopLeftCorner>
        <TileWidth>256</TileWidth>
        <TileHeight>256</TileHeight>
        <MatrixWidth>2</MatrixWidth>
        <MatrixHeight>2</MatrixHeight>
      </TileMatrix>
      <TileMatrix>
        <ows:Identifier>0</ows:Identifier>
        <ScaleDenominator>559082264.0287178</ScaleDenominator>
        <TopLeftCorner>-20037508.3427892 20037508.3427892</TopLeftCorner>
        <TileWidth>256</TileWidth>
        <TileHeight>256</TileHeight>
        <MatrixWidth>1</MatrixWidth>
        <MatrixHeight>1</MatrixHeight>
      </TileMatrix>
      <TileMatrix>
        <ows:Identifier>2</ows:Identifier>
        <ScaleDenominator>139770566.0071794</ScaleDenominator>
        <TopLeftCorner>-20037508.3427892 20037508.3427892</TopLeftCorner>
        <TileWidth>256</TileWidth>
        <TileHeight>256</TileHeight>
        <MatrixWidth>4</MatrixWidth>
        <MatrixHeight>4</MatrixHeight>
      </TileMatrix>
    </TileMatrixSet>
    <TileMatrixSet>
      <ows:Identifier>WGS84</ows:Identifier>
      <ows:SupportedCRS>urn:ogc:def:crs:EPSG::4326</ows:SupportedCRS>
      <TileMatrix>
        <ows:Identifier>0</ows:Identifier>
        <ScaleDenominator>279541132.0143589</ScaleDenominator>
        <TopLeftCorner>90 -180</TopLeftCorner>
        <TileWidth>256</TileWidth>
        <TileHeight>256</TileHeight>
        <MatrixWidth>2</MatrixWidth>
        <MatrixHeight>1</MatrixHeight>
      </TileMatrix>
    </TileMatrixSet>
  </Contents>
</Capabilities>
"#;

    /// WMTS document without any ResourceURL, forcing KVP templates.
    pub const WMTS_KVP_ONLY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Capabilities xmlns="http://www.opengis.net/wmts/1.0" xmlns:ows="http://www.opengis.net/ows/1.1" xmlns:xlink="http://www.w3.org/1999/xlink" version="1.0.0">
  <ows:OperationsMetadata>
    <ows:Operation name="GetTile">
      <ows:DCP><ows:HTTP><ows:Get xlink:href="https://kvp.example.com/service/wmts?"/></ows:HTTP></ows:DCP>
    </ows:Operation>
  </ows:OperationsMetadata>
  <Contents>
    <Layer>
      <ows:Identifier>roads</ows:Identifier>
      <Style><ows:Identifier>default</ows:Identifier></Style>
      <Format>image/png; mode=8bit</Format>
      <TileMatrixSetLink><TileMatrixSet>GoogleMapsCompatible</TileMatrixSet></TileMatrixSetLink>
    </Layer>
    <TileMatrixSet>
      <ows:Identifier>GoogleMapsCompatible</ows:Identifier>
      <ows:SupportedCRS>EPSG:3857</ows:SupportedCRS>
      <TileMatrix>
        <ows:Identifier>GoogleMapsCompatible:0</ows:Identifier>
        <ScaleDenominator>559082264.0287178</ScaleDenominator>
        <TopLeftCorner>-20037508.3427892 20037508.3427892</TopLeftCorner>
        <TileWidth>512</TileWidth>
        <TileHeight>512</TileHeight>
        <MatrixWidth>1</MatrixWidth>
        <MatrixHeight>1</MatrixHeight>
      </TileMatrix>
    </TileMatrixSet>
  </Contents>
</Capabilities>
"#;

    /// Syntactically valid WMTS document with no layers.
    pub const WMTS_EMPTY: &str = r#"<?xml version="1.0"?>
<Capabilities xmlns="http://www.opengis.net/wmts/1.0" version="1.0.0"><Contents/></Capabilities>"#;

    /// WMS 1.3.0 with a nested layer tree.
    pub const WMS_130: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<WMS_Capabilities version="1.3.0" xmlns="http://www.opengis.net/wms" xmlns:xlink="http://www.w3.org/1999/xlink">
  <Service>
    <Name>WMS</Name>
    <Title>Weather Maps</Title>
    <Abstract>Forecast layers</Abstract>
    <KeywordList>
      <Keyword>weather</Keyword>
      <Keyword>forecast</Keyword>
    </KeywordList>
  </Service>
  <Capability>
    <Request>
      <GetCapabilities>
        <Format>text/xml</Format>
      </GetCapabilities>
      <GetMap>
        <Format>image/png</Format>
        <Format>image/jpeg</Format>
        <DCPType><HTTP><Get><OnlineResource xlink:type="simple" xlink:href="https://maps.example.com/wms?"/></Get></HTTP></DCPType>
      </GetMap>
    </Request>
    <Layer>
      <Title>Root</Title>
      <CRS>EPSG:4326</CRS>
      <CRS>EPSG:3857</CRS>
      <EX_GeographicBoundingBox>
        <westBoundLongitude>-180</westBoundLongitude>
        <eastBoundLongitude>180</eastBoundLongitude>
        <southBoundLatitude>-90</southBoundLatitude>
        <northBoundLatitude>90</northBoundLatitude>
      </EX_GeographicBoundingBox>
      <Style>
        <Name>default</Name>
        <Title>Default</Title>
      </Style>
      <Layer queryable="1">
        <Name>temperature</Name>
        <Title>Air temperature</Title>
        <CRS>EPSG:32632</CRS>
        <BoundingBox CRS="EPSG:3857" minx="-1000" miny="-2000" maxx="1000" maxy="2000"/>
        <Dimension name="time" units="ISO8601" default="2024-01-15T12:00:00Z">2024-01-15T12:00:00Z,2024-01-15T18:00:00Z</Dimension>
        <Style>
          <Name>gradient</Name>
          <Title>Gradient</Title>
          <LegendURL width="20" height="200">
            <Format>image/png</Format>
            <OnlineResource xlink:type="simple" xlink:href="https://maps.example.com/legend/temperature.png"/>
          </LegendURL>
        </Style>
      </Layer>
      <Layer>
        <Title>Group</Title>
        <Layer>
          <Name>wind</Name>
          <Title>Wind</Title>
        </Layer>
      </Layer>
    </Layer>
  </Capability>
</WMS_Capabilities>
"#;

    /// WMS 1.1.1 using SRS and LatLonBoundingBox.
    pub const WMS_111: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE WMT_MS_Capabilities SYSTEM "http://schemas.opengis.net/wms/1.1.1/WMS_MS_Capabilities.dtd">
<WMT_MS_Capabilities version="1.1.1">
  <Service>
    <Name>OGC:WMS</Name>
    <Title>Legacy Server</Title>
  </Service>
  <Capability>
    <Request>
      <GetMap>
        <Format>image/gif</Format>
        <DCPType><HTTP><Get><OnlineResource xmlns:xlink="http://www.w3.org/1999/xlink" xlink:href="http://legacy.example.com/cgi-bin/wms?"/></Get></HTTP></DCPType>
      </GetMap>
    </Request>
    <Layer>
      <Name>countries</Name>
      <Title>Countries</Title>
      <SRS>EPSG:4326</SRS>
      <LatLonBoundingBox minx="-180" miny="-90" maxx="180" maxy="90"/>
    </Layer>
  </Capability>
</WMT_MS_Capabilities>
"#;

    /// An OWS exception report returned instead of capabilities.
    pub const OWS_EXCEPTION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ows:ExceptionReport xmlns:ows="http://www.opengis.net/ows/1.1" version="1.0.0">
  <ows:Exception exceptionCode="InvalidParameterValue" locator="service">
    <ows:ExceptionText>Unknown service</ows:ExceptionText>
  </ows:Exception>
</ows:ExceptionReport>"#;

    /// Truncated document.
    pub const MALFORMED: &str = r#"<?xml version="1.0"?>
<Capabilities version="1.0.0"><Contents><Layer><ows:Identifier>x</ows:Identifier></Contents>"#;
}

/// Persisted layer envelopes as they would come back from storage.
pub mod envelopes {
    use serde_json::{json, Value};

    /// Minimal WMS envelope with `layers` stored as a plain string.
    pub fn wms_minimal() -> Value {
        json!({
            "_version": 1,
            "_type": "wms-raster",
            "id": "t",
            "baseUrl": "https://h/wms",
            "layers": "l"
        })
    }

    /// XYZ envelope with every optional field populated.
    pub fn xyz_full() -> Value {
        json!({
            "_version": 1,
            "_type": "xyz-raster",
            "id": "osm",
            "title": "OpenStreetMap",
            "attribution": "© OpenStreetMap contributors",
            "opacity": 0.8,
            "minZoom": 0,
            "maxZoom": 19,
            "urlTemplate": "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            "subdomains": ["a", "b", "c"],
            "tms": false,
            "tileSize": 256
        })
    }
}
